use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::schema::SchemaDescriptor;

/// Reliability below this score is flagged as prone to peak-hour delays
pub const PEAK_DELAY_THRESHOLD: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportType {
    Bus,
    /// Minibus taxi
    Taxi,
    Train,
}

impl TransportType {
    pub const ALL: [TransportType; 3] = [TransportType::Bus, TransportType::Taxi, TransportType::Train];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Bus => "BUS",
            TransportType::Taxi => "TAXI",
            TransportType::Train => "TRAIN",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TransportType::Bus => "🚌",
            TransportType::Taxi => "🚐",
            TransportType::Train => "🚆",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate trip as suggested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteOption {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransportType,
    pub provider: String,
    /// Display text, not a normalized timestamp
    pub departure_time: String,
    pub duration: String,
    /// Fare in Rand
    pub price: f64,
    pub stops: Vec<String>,
    /// 0-100
    pub reliability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sponsored: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityBadge {
    PeakDelays,
    RealTimeFast,
}

impl ReliabilityBadge {
    pub fn label(&self) -> &'static str {
        match self {
            ReliabilityBadge::PeakDelays => "Peak Delays",
            ReliabilityBadge::RealTimeFast => "Real-time Fast",
        }
    }
}

impl RouteOption {
    pub fn badge(&self) -> ReliabilityBadge {
        if self.reliability < PEAK_DELAY_THRESHOLD {
            ReliabilityBadge::PeakDelays
        } else {
            ReliabilityBadge::RealTimeFast
        }
    }

    pub fn sponsored(&self) -> bool {
        self.is_sponsored.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Completed,
    Cancelled,
}

/// A confirmed booking held in the wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub route_id: String,
    pub provider: String,
    pub from: String,
    pub to: String,
    /// en-ZA localized date, e.g. 2026/10/19
    pub date: String,
    pub time: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: TransportType,
    pub qr_code: String,
    pub status: TicketStatus,
}

/// Partner deal shown alongside the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub partner: String,
    pub deal: String,
    pub expiry: String,
    pub icon: String,
}

impl Reward {
    fn new(id: &str, partner: &str, deal: &str, expiry: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            partner: partner.to_string(),
            deal: deal.to_string(),
            expiry: expiry.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn catalogue() -> Vec<Reward> {
        vec![
            Reward::new("r1", "Shoprite", "R10 Off Airtime", "2 days", "🛍️"),
            Reward::new("r2", "Debonairs", "Free Delivery", "5 days", "🍕"),
            Reward::new("r3", "Checkers", "Sixty60 Credit", "1 day", "🛵"),
        ]
    }
}

// Gemini generateContent wire format

/// Capability hints the model may use while answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    GoogleSearch,
    GoogleMaps,
}

impl Tool {
    fn key(&self) -> &'static str {
        match self {
            Tool::GoogleSearch => "googleSearch",
            Tool::GoogleMaps => "googleMaps",
        }
    }
}

impl Serialize for Tool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key(), &serde_json::Map::new())?;
        map.end()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: SchemaDescriptor,
}

// Gemini API request format; the model travels in the URL
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

// Gemini API response format
#[derive(Debug, Deserialize, Default, Clone)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GeminiResponse {
    /// Text of the first candidate, or None when the model said nothing
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![ResponsePart {
                        text: Some(text.to_string()),
                    }],
                }),
            }],
        }
    }
}

use async_trait::async_trait;
use std::sync::Arc;

use crate::adapter::AiClient;
use crate::config::Config;
use crate::error::{MzaniGoError, Result};
use crate::models::Tool;

/// Shown when the model answers with nothing at all
pub const ADVICE_FALLBACK: &str = "Scanning for local ranks...";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Fallible: transport failures are returned to the caller
    async fn get_taxi_advice(&self, location: &str) -> Result<String>;
}

pub struct TravelAdviceService {
    client: Arc<AiClient>,
    model: String,
    tools: Vec<Tool>,
    country: String,
}

impl TravelAdviceService {
    pub fn new(client: Arc<AiClient>, cfg: &Config) -> Self {
        let tools = if cfg.gemini.advice_search {
            vec![Tool::GoogleSearch]
        } else {
            Vec::new()
        };
        Self {
            client,
            model: cfg.gemini.advice_model.clone(),
            tools,
            country: cfg.locale.country.clone(),
        }
    }
}

pub fn advice_prompt(location: &str, country: &str) -> String {
    format!(
        r#"Expert advice for a commuter at {location}, {country}.
Identify the nearest formal and informal taxi ranks.
Explain the specific hand sign (finger up, flat hand, etc.) for common destinations from this rank.
Add a brief "Local Wisdom" safety tip."#
    )
}

#[async_trait]
impl AdviceProvider for TravelAdviceService {
    async fn get_taxi_advice(&self, location: &str) -> Result<String> {
        let location = location.trim();
        if location.is_empty() {
            return Err(MzaniGoError::validation(
                "location",
                "a rank or area is required",
            ));
        }

        tracing::info!("Fetching taxi advice for '{}'", location);
        let prompt = advice_prompt(location, &self.country);
        self.client
            .request_freeform(&self.model, &prompt, &self.tools)
            .await
    }
}

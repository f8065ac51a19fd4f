use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Arc;

use crate::adapter::AiClient;
use crate::config::Config;
use crate::models::{RouteOption, Tool};
use crate::schema::{SchemaDescriptor, route_list_schema};

/// Number of candidate routes requested per search
pub const ROUTES_PER_SEARCH: usize = 3;

/// Local wall-clock source, read once per route request
pub type Clock = Arc<dyn Fn() -> DateTime<FixedOffset> + Send + Sync>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteSuggester: Send + Sync {
    /// Never fails; an unusable answer is an empty list
    async fn get_route_suggestions(&self, from: &str, to: &str) -> Vec<RouteOption>;
}

pub struct RouteSuggestionService {
    client: Arc<AiClient>,
    model: String,
    tools: Vec<Tool>,
    country: String,
    clock: Clock,
    schema: SchemaDescriptor,
}

impl RouteSuggestionService {
    pub fn new(client: Arc<AiClient>, cfg: &Config) -> Self {
        let mut tools = Vec::new();
        if cfg.gemini.route_search {
            tools.push(Tool::GoogleSearch);
        }
        if cfg.gemini.route_maps {
            tools.push(Tool::GoogleMaps);
        }
        let offset = local_offset(cfg.locale.utc_offset_minutes);
        Self {
            client,
            model: cfg.gemini.route_model.clone(),
            tools,
            country: cfg.locale.country.clone(),
            clock: Arc::new(move || Utc::now().with_timezone(&offset)),
            schema: route_list_schema(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Falls back to SAST if the configured offset is out of range
pub fn local_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60)
        .or_else(|| FixedOffset::east_opt(2 * 3600))
        .unwrap_or_else(|| Utc.fix())
}

/// en-ZA style wall-clock stamp, e.g. `2026/10/19, 07:45:00`
pub fn local_timestamp(now: &DateTime<FixedOffset>) -> String {
    now.format("%Y/%m/%d, %H:%M:%S").to_string()
}

pub fn route_prompt(from: &str, to: &str, country: &str, now: &DateTime<FixedOffset>) -> String {
    format!(
        r#"Find {ROUTES_PER_SEARCH} realistic public transport routes between "{from}" and "{to}" in {country}.
Current Date/Time: {stamp}.
Check for:
1. Real-time traffic and Golden Arrow/MyCiTi/Rea Vaya schedules.
2. Any active minibus taxi strikes or protests in these areas.
3. Load shedding impact on traffic lights in these zones.
Return only JSON."#,
        stamp = local_timestamp(now),
    )
}

#[async_trait]
impl RouteSuggester for RouteSuggestionService {
    async fn get_route_suggestions(&self, from: &str, to: &str) -> Vec<RouteOption> {
        tracing::info!("Fetching route suggestions from '{}' to '{}'", from, to);

        // Stamp taken per call so the model reasons about "now"
        let prompt = route_prompt(from, to, &self.country, &(self.clock)());

        let routes: Vec<RouteOption> = self
            .client
            .request_structured(&self.model, &prompt, &self.schema, &self.tools)
            .await;

        tracing::info!("Model returned {} route(s)", routes.len());
        routes
    }
}

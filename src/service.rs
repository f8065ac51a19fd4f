use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::error::MzaniGoError;
use crate::models::{Reward, RouteOption};
use crate::planner::{TripPlanner, device_location};
use crate::rate_limit::RateLimiter;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MzRoutesParams {
    #[schemars(description = "Where the trip starts: a place name or 'lat, lon (My Location)'")]
    pub from: String,
    #[schemars(description = "Where the trip ends")]
    pub to: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MzLocateParams {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MzAdviceParams {
    #[schemars(description = "Nearest rank or area, e.g. 'Bree Street' or 'Bellville'")]
    pub location: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MzBookParams {
    #[schemars(description = "A route exactly as returned by mz_routes")]
    pub route: RouteOption,
    #[schemars(description = "Origin shown on the ticket (defaults to 'Current Location')")]
    pub from: Option<String>,
    #[schemars(description = "Destination shown on the ticket (defaults to 'Destination')")]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MzTicketsParams {
    #[schemars(description = "Optional ticket id; omit to list the whole wallet")]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MzRecentsParams {
    #[schemars(regex(pattern = r"^(list|clear)$"))]
    #[schemars(description = "'list' (default) or 'clear'")]
    pub action: Option<String>,
}

fn to_error_data(tool: &str, e: MzaniGoError) -> ErrorData {
    match &e {
        MzaniGoError::Validation { .. } | MzaniGoError::NotFound(_) => {
            tracing::warn!("{} rejected: {}", tool, e);
            ErrorData::invalid_params(e.to_string(), None)
        }
        MzaniGoError::RateLimited(_) => {
            tracing::warn!("{} rate limited: {}", tool, e);
            ErrorData::invalid_params(
                "Rate limit exceeded. Please slow down your requests.".to_string(),
                None,
            )
        }
        _ => {
            tracing::error!("{} error: {}", tool, e);
            ErrorData::internal_error(e.to_string(), None)
        }
    }
}

fn json_result<T: serde::Serialize>(value: T) -> Result<CallToolResult, ErrorData> {
    let content = Content::json(value).map_err(|e| {
        ErrorData::internal_error(format!("Failed to create JSON content: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![content]))
}

/// MCP server exposing the trip planner
#[derive(Clone)]
pub struct MzaniGoService {
    tool_router: ToolRouter<Self>,
    planner: Arc<TripPlanner>,
    rate_limiter: Arc<RateLimiter>,
    config: Arc<Config>,
}

impl MzaniGoService {
    pub fn new(config: Arc<Config>, planner: Arc<TripPlanner>) -> Self {
        tracing::info!(
            "Service::new() - MzaniGo tools ready for user '{}'",
            planner.user_id()
        );
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limiter.max_requests as usize,
            config.rate_limiter.window_seconds as u64,
        ));
        Self {
            tool_router: Self::tool_router(),
            planner,
            rate_limiter,
            config,
        }
    }

    async fn check_quota(&self, tool: &str) -> Result<(), ErrorData> {
        self.rate_limiter
            .check_rate_limit(self.planner.user_id())
            .await
            .map_err(|e| to_error_data(tool, e))
    }
}

#[tool_router]
impl MzaniGoService {
    #[tool(description = "Find 3 AI-suggested bus, minibus taxi or train routes between two places in South Africa")]
    pub async fn mz_routes(
        &self,
        params: Parameters<MzRoutesParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.check_quota("mz_routes").await?;

        let outcome = self
            .planner
            .search(&params.0.from, &params.0.to)
            .await
            .map_err(|e| to_error_data("mz_routes", e))?;

        let message = if outcome.routes.is_empty() {
            "No routes found".to_string()
        } else {
            format!("{} route(s) found", outcome.routes.len())
        };

        json_result(json!({
            "message": message,
            "from": outcome.from,
            "to": outcome.to,
            "routes": outcome.routes,
            "recents": outcome.recents,
        }))
    }

    #[tool(description = "Turn a device GPS fix into an origin string for mz_routes")]
    pub async fn mz_locate(
        &self,
        params: Parameters<MzLocateParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let origin = device_location(params.0.latitude, params.0.longitude)
            .map_err(|e| to_error_data("mz_locate", e))?;
        json_result(json!({ "from": origin }))
    }

    #[tool(description = "Minibus taxi guide: nearest formal and informal ranks, hand signs and a local safety tip")]
    pub async fn mz_advice(
        &self,
        params: Parameters<MzAdviceParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.check_quota("mz_advice").await?;

        match self.planner.taxi_advice(&params.0.location).await {
            Ok(advice) => Ok(CallToolResult::success(vec![Content::text(advice)])),
            Err(e) => Err(to_error_data("mz_advice", e)),
        }
    }

    #[tool(description = "Book a seat on a route via simulated payment and store the ticket in the wallet")]
    pub async fn mz_book(
        &self,
        params: Parameters<MzBookParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let MzBookParams { route, from, to } = params.0;
        let ticket = self
            .planner
            .book(&route, from.as_deref(), to.as_deref())
            .await
            .map_err(|e| to_error_data("mz_book", e))?;
        json_result(ticket)
    }

    #[tool(description = "List wallet tickets (newest first) or fetch one by id")]
    pub async fn mz_tickets(
        &self,
        params: Parameters<MzTicketsParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match params.0.id {
            Some(id) => {
                let ticket = self
                    .planner
                    .ticket(&id)
                    .await
                    .map_err(|e| to_error_data("mz_tickets", e))?;
                json_result(ticket)
            }
            None => {
                let tickets = self
                    .planner
                    .tickets()
                    .await
                    .map_err(|e| to_error_data("mz_tickets", e))?;
                json_result(tickets)
            }
        }
    }

    #[tool(description = "List or clear the five most recent destinations")]
    pub async fn mz_recents(
        &self,
        params: Parameters<MzRecentsParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match params.0.action.as_deref().unwrap_or("list") {
            "list" => {
                let recents = self
                    .planner
                    .recents()
                    .await
                    .map_err(|e| to_error_data("mz_recents", e))?;
                json_result(recents)
            }
            "clear" => {
                self.planner
                    .clear_recents()
                    .await
                    .map_err(|e| to_error_data("mz_recents", e))?;
                json_result(json!({ "status": "cleared" }))
            }
            other => Err(ErrorData::invalid_params(
                format!("Invalid action '{other}'. Must be 'list' or 'clear'."),
                None,
            )),
        }
    }

    #[tool(description = "Partner rewards available to commuters")]
    pub async fn mz_rewards(&self) -> std::result::Result<CallToolResult, ErrorData> {
        json_result(Reward::catalogue())
    }
}

#[tool_handler]
impl ServerHandler for MzaniGoService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "MzaniGo commuter planner: route suggestions, minibus taxi advice and a ticket wallet for South African public transport".into(),
            ),
        }
    }
}

use serde::Serialize;
use std::sync::Arc;

use crate::adapter::{AiClient, DegradationObserver};
use crate::advice::{AdviceProvider, TravelAdviceService};
use crate::booking::BookingService;
use crate::config::Config;
use crate::error::{MzaniGoError, Result};
use crate::models::{RouteOption, Ticket};
use crate::routes::{RouteSuggester, RouteSuggestionService};
use crate::schema::route_option_schema;
use crate::storage::KeyValueStore;
use crate::transport::{GeminiTransport, Transport};
use crate::wallet::Wallet;

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub from: String,
    pub to: String,
    pub routes: Vec<RouteOption>,
    pub recents: Vec<String>,
}

impl SearchOutcome {
    /// Route by its 1-based position in the listing
    pub fn route(&self, number: usize) -> Option<&RouteOption> {
        number.checked_sub(1).and_then(|i| self.routes.get(i))
    }
}

/// Origin text for a device fix, e.g. `-26.2041, 28.0473 (My Location)`
pub fn device_location(latitude: f64, longitude: f64) -> Result<String> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(MzaniGoError::validation(
            "latitude",
            "must be between -90 and 90",
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(MzaniGoError::validation(
            "longitude",
            "must be between -180 and 180",
        ));
    }
    Ok(format!("{latitude:.4}, {longitude:.4} (My Location)"))
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(MzaniGoError::validation(field, "cannot be empty"))
    } else {
        Ok(value)
    }
}

/// Entry points used by the MCP tools and the CLI.
///
/// Owns the user's wallet; the AI-facing services behind it are stateless.
pub struct TripPlanner {
    routes: Arc<dyn RouteSuggester>,
    advice: Arc<dyn AdviceProvider>,
    booking: BookingService,
    wallet: Wallet,
}

impl TripPlanner {
    pub fn new(
        routes: Arc<dyn RouteSuggester>,
        advice: Arc<dyn AdviceProvider>,
        booking: BookingService,
        wallet: Wallet,
    ) -> Self {
        Self {
            routes,
            advice,
            booking,
            wallet,
        }
    }

    /// Wire the Gemini-backed services for the configured default user
    pub fn from_config(
        cfg: &Config,
        store: Arc<dyn KeyValueStore>,
        observer: Option<Arc<dyn DegradationObserver>>,
    ) -> Result<Self> {
        let transport = Arc::new(GeminiTransport::new(&cfg.gemini, cfg.gemini_timeout())?);
        Ok(Self::with_transport(cfg, transport, store, observer))
    }

    pub fn with_transport(
        cfg: &Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        observer: Option<Arc<dyn DegradationObserver>>,
    ) -> Self {
        let mut client = AiClient::new(transport, cfg.gemini.advice_fallback.clone());
        if let Some(observer) = observer {
            client = client.with_observer(observer);
        }
        let client = Arc::new(client);

        Self::new(
            Arc::new(RouteSuggestionService::new(Arc::clone(&client), cfg)),
            Arc::new(TravelAdviceService::new(Arc::clone(&client), cfg)),
            BookingService::new(cfg),
            Wallet::new(store, cfg.server.default_user_id.clone()),
        )
    }

    pub fn user_id(&self) -> &str {
        self.wallet.user_id()
    }

    /// Remember the destination, then ask for routes.
    ///
    /// Only blank input or a storage failure is an error; a model failure
    /// is an empty route list.
    pub async fn search(&self, from: &str, to: &str) -> Result<SearchOutcome> {
        let from = required("from", from)?;
        let to = required("to", to)?;

        let recents = self.wallet.record_search(to).await?;
        let routes = self.routes.get_route_suggestions(from, to).await;

        if routes.is_empty() {
            tracing::info!("No routes found from '{}' to '{}'", from, to);
        }

        Ok(SearchOutcome {
            from: from.to_string(),
            to: to.to_string(),
            routes,
            recents,
        })
    }

    pub async fn taxi_advice(&self, location: &str) -> Result<String> {
        self.advice.get_taxi_advice(location).await
    }

    /// Pay for a route and keep the ticket in the wallet
    pub async fn book(
        &self,
        route: &RouteOption,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Ticket> {
        // routes can arrive from outside the planner; hold them to the model schema
        route_option_schema().validate(&serde_json::to_value(route)?)?;

        let quote = self.booking.quote(route);
        tracing::info!(
            "Booking {} departing {} for R{}",
            quote.provider,
            quote.departure_time,
            quote.total
        );

        let from = from.map(str::trim).filter(|s| !s.is_empty());
        let to = to.map(str::trim).filter(|s| !s.is_empty());
        let ticket = self.booking.confirm(route, from, to).await?;
        self.wallet.add_ticket(ticket.clone()).await?;
        Ok(ticket)
    }

    pub async fn tickets(&self) -> Result<Vec<Ticket>> {
        self.wallet.tickets().await
    }

    pub async fn ticket(&self, id: &str) -> Result<Ticket> {
        self.wallet.ticket(id).await
    }

    pub async fn recents(&self) -> Result<Vec<String>> {
        self.wallet.recents().await
    }

    pub async fn clear_recents(&self) -> Result<()> {
        self.wallet.clear_recents().await
    }
}

use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::models::{RouteOption, Ticket, TicketStatus};
use crate::routes::local_offset;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TICKET_ID_LEN: usize = 9;
const QR_TOKEN_LEN: usize = 6;

pub const DEFAULT_FROM: &str = "Current Location";
pub const DEFAULT_TO: &str = "Destination";

/// What the rider sees before paying
#[derive(Debug, Clone, Serialize)]
pub struct BookingQuote {
    pub route_id: String,
    pub provider: String,
    pub departure_time: String,
    pub total: f64,
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// en-ZA short date, e.g. `2026/10/19`
pub fn local_date(now: &DateTime<FixedOffset>) -> String {
    now.format("%Y/%m/%d").to_string()
}

/// Simulated seat booking. No money moves; payment is a fixed delay.
pub struct BookingService {
    payment_delay: Duration,
    qr_prefix: String,
    offset: FixedOffset,
}

impl BookingService {
    pub fn new(cfg: &Config) -> Self {
        Self {
            payment_delay: cfg.payment_delay(),
            qr_prefix: cfg.booking.qr_prefix.clone(),
            offset: local_offset(cfg.locale.utc_offset_minutes),
        }
    }

    pub fn quote(&self, route: &RouteOption) -> BookingQuote {
        BookingQuote {
            route_id: route.id.clone(),
            provider: route.provider.clone(),
            departure_time: route.departure_time.clone(),
            total: route.price,
        }
    }

    /// Wait out the payment authorisation and issue an active ticket
    pub async fn confirm(
        &self,
        route: &RouteOption,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Ticket> {
        tracing::info!(
            "Authorising R{} with {} for route {}",
            route.price,
            route.provider,
            route.id
        );
        tokio::time::sleep(self.payment_delay).await;

        let now = Utc::now().with_timezone(&self.offset);
        let ticket = Ticket {
            id: random_token(TICKET_ID_LEN),
            route_id: route.id.clone(),
            provider: route.provider.clone(),
            from: from.unwrap_or(DEFAULT_FROM).to_string(),
            to: to.unwrap_or(DEFAULT_TO).to_string(),
            date: local_date(&now),
            time: route.departure_time.clone(),
            price: route.price,
            kind: route.kind,
            qr_code: format!("{}{}", self.qr_prefix, random_token(QR_TOKEN_LEN)),
            status: TicketStatus::Active,
        };
        tracing::info!("Issued ticket {} ({})", ticket.id, ticket.qr_code);
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransportType;
    use chrono::TimeZone;
    use std::time::Instant;

    fn route() -> RouteOption {
        RouteOption {
            id: "gt-3".to_string(),
            kind: TransportType::Train,
            provider: "Gautrain".to_string(),
            departure_time: "07:20".to_string(),
            duration: "15 min".to_string(),
            price: 48.0,
            stops: vec!["Park Station".to_string(), "Sandton".to_string()],
            reliability: 97.0,
            is_sponsored: None,
        }
    }

    fn service(delay_ms: u64) -> BookingService {
        let mut cfg = Config::default();
        cfg.booking.payment_delay_ms = delay_ms;
        BookingService::new(&cfg)
    }

    #[test]
    fn test_quote_mirrors_route() {
        let quote = service(0).quote(&route());
        assert_eq!(quote.provider, "Gautrain");
        assert_eq!(quote.departure_time, "07:20");
        assert_eq!(quote.total, 48.0);
    }

    #[test]
    fn test_local_date_format() {
        let now = local_offset(120).with_ymd_and_hms(2026, 3, 7, 23, 30, 0).unwrap();
        assert_eq!(local_date(&now), "2026/03/07");
    }

    #[tokio::test]
    async fn test_confirm_issues_active_ticket_for_route() {
        let ticket = service(0)
            .confirm(&route(), Some("Park Station"), Some("Sandton"))
            .await
            .unwrap();

        assert_eq!(ticket.route_id, "gt-3");
        assert_eq!(ticket.kind, TransportType::Train);
        assert_eq!(ticket.time, "07:20");
        assert_eq!(ticket.status, TicketStatus::Active);
        assert_eq!(ticket.from, "Park Station");
        assert_eq!(ticket.id.len(), 9);
        assert!(ticket.id.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
        assert!(ticket.qr_code.starts_with("MZ-"));
        assert_eq!(ticket.qr_code.len(), 9);
    }

    #[tokio::test]
    async fn test_missing_endpoints_use_placeholders() {
        let ticket = service(0).confirm(&route(), None, None).await.unwrap();
        assert_eq!(ticket.from, "Current Location");
        assert_eq!(ticket.to, "Destination");
    }

    #[tokio::test]
    async fn test_payment_waits_for_delay() {
        let start = Instant::now();
        service(30).confirm(&route(), None, None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}

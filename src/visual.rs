use colored::*;

use crate::adapter::{CallFamily, DegradationObserver};
use crate::error::MzaniGoError;
use crate::models::{ReliabilityBadge, Reward, RouteOption, Ticket, TransportType};

/// Terminal rendering for the planner CLI
pub struct VisualOutput;

impl VisualOutput {
    pub fn route_card(index: usize, route: &RouteOption) -> String {
        let provider = if route.kind == TransportType::Taxi {
            route.provider.bright_yellow().bold()
        } else {
            route.provider.bright_blue().bold()
        };
        let sponsored = if route.sponsored() {
            format!(" {}", "RECOMMENDED".green())
        } else {
            String::new()
        };
        let badge = match route.badge() {
            ReliabilityBadge::PeakDelays => route.badge().label().red(),
            ReliabilityBadge::RealTimeFast => route.badge().label().green(),
        };

        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {}{}  {}\n",
            format!("{}.", index + 1).dimmed(),
            route.kind.icon(),
            provider,
            sponsored,
            format!("R{}", route.price).bold()
        ));
        out.push_str(&format!(
            "   {} {}  {} trip  {}% score  {}\n",
            "⏱".cyan(),
            route.departure_time,
            route.duration,
            route.reliability,
            badge
        ));
        if !route.stops.is_empty() {
            out.push_str(&format!("   {}\n", route.stops.join(" → ").dimmed()));
        }
        out
    }

    pub fn route_list(routes: &[RouteOption]) -> String {
        if routes.is_empty() {
            return format!("{}\n", "No routes found.".yellow());
        }
        routes
            .iter()
            .enumerate()
            .map(|(i, r)| Self::route_card(i, r))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn ticket_card(ticket: &Ticket) -> String {
        format!(
            "{} {} {}\n   {} → {}\n   {} {}  R{}  {}\n",
            ticket.kind.icon(),
            ticket.provider.bold(),
            format!("#{}", ticket.id).dimmed(),
            ticket.from,
            ticket.to,
            ticket.date,
            ticket.time,
            ticket.price,
            ticket.qr_code.bright_white().on_black()
        )
    }

    pub fn advice(text: &str) -> String {
        format!("{} {}\n\n\"{}\"\n", "🚐", "Minibus Guide".bright_yellow().bold(), text.italic())
    }

    pub fn rewards(rewards: &[Reward]) -> String {
        rewards
            .iter()
            .map(|r| format!("{} {} {} ({})", r.icon, r.partner.blue().bold(), r.deal, r.expiry))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Tells the CLI user when a model answer was dropped or replaced by a fallback
pub struct NoticeObserver;

impl DegradationObserver for NoticeObserver {
    fn degraded(&self, family: CallFamily, error: &MzaniGoError) {
        eprintln!(
            "   {} {} call degraded: {}",
            "⚠".bright_yellow(),
            family,
            error.to_string().dimmed()
        );
    }
}

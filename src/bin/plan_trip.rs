use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use colored::*;

use mzanigo::config::Config;
use mzanigo::models::Reward;
use mzanigo::planner::{TripPlanner, device_location};
use mzanigo::storage::{JsonFileStore, KeyValueStore};
use mzanigo::visual::{NoticeObserver, VisualOutput};

const USAGE: &str = "usage:
  plan_trip <from> <to>                 suggest routes
  plan_trip --here <lat> <lon> <to>     suggest routes from a GPS fix
  plan_trip --book <n> <from> <to>      search, then book route n
  plan_trip --advice <location>         minibus taxi guide
  plan_trip --tickets                   show the wallet
  plan_trip --recents | --clear-recents
  plan_trip --rewards";

fn arg(args: &[String], i: usize, name: &str) -> Result<String> {
    args.get(i)
        .cloned()
        .ok_or_else(|| anyhow!("missing <{name}>\n{USAGE}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Minimal stderr tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::load();
    let store: Arc<dyn KeyValueStore> = Arc::new(
        JsonFileStore::open(config.data_dir())
            .await
            .context("opening data directory")?,
    );
    let planner = TripPlanner::from_config(&config, store, Some(Arc::new(NoticeObserver)))?;

    match args[0].as_str() {
        "--advice" => {
            let location = arg(&args, 1, "location")?;
            let advice = planner
                .taxi_advice(&location)
                .await
                .context("the minibus guide is unavailable right now")?;
            println!("{}", VisualOutput::advice(&advice));
        }
        "--tickets" => {
            let tickets = planner.tickets().await?;
            if tickets.is_empty() {
                println!("{}", "No tickets yet. Book a ride to see it here.".dimmed());
            }
            for ticket in &tickets {
                println!("{}", VisualOutput::ticket_card(ticket));
            }
        }
        "--recents" => {
            for (i, dest) in planner.recents().await?.iter().enumerate() {
                println!("{} {}", format!("{}.", i + 1).dimmed(), dest);
            }
        }
        "--clear-recents" => {
            planner.clear_recents().await?;
            println!("Recent destinations cleared.");
        }
        "--rewards" => {
            println!("{}", VisualOutput::rewards(&Reward::catalogue()));
        }
        "--book" => {
            let n: usize = arg(&args, 1, "n")?
                .parse()
                .context("<n> must be a route number")?;
            let from = arg(&args, 2, "from")?;
            let to = arg(&args, 3, "to")?;

            let outcome = planner.search(&from, &to).await?;
            print!("{}", VisualOutput::route_list(&outcome.routes));
            let route = outcome
                .route(n)
                .ok_or_else(|| anyhow!("no route #{n} in this search"))?;

            println!("\n{}", "Authenticating payment...".dimmed());
            let ticket = planner
                .book(route, Some(outcome.from.as_str()), Some(outcome.to.as_str()))
                .await?;
            println!("{}\n", "Hooray! Your ticket is active.".green().bold());
            println!("{}", VisualOutput::ticket_card(&ticket));
        }
        "--here" => {
            let lat: f64 = arg(&args, 1, "lat")?.parse().context("<lat> must be a number")?;
            let lon: f64 = arg(&args, 2, "lon")?.parse().context("<lon> must be a number")?;
            let to = arg(&args, 3, "to")?;
            let from = device_location(lat, lon)?;
            let outcome = planner.search(&from, &to).await?;
            print!("{}", VisualOutput::route_list(&outcome.routes));
        }
        _ => {
            let from = arg(&args, 0, "from")?;
            let to = arg(&args, 1, "to")?;
            let outcome = planner.search(&from, &to).await?;
            print!("{}", VisualOutput::route_list(&outcome.routes));
        }
    }

    Ok(())
}

/// Base token scraper - polls the tracked dashboard and relays newly
/// discovered tokens to the relay backend.

use anyhow::Result;
use colored::Colorize;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use basetrack::core::config::ScraperConfig;
use basetrack::extract::DedupTracker;
use basetrack::ingest::{HttpPageSource, IngestionLoop, RelayClient};

fn init_tracing() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(console_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ScraperConfig::from_env();
    println!("{}", "🚀 Base token scraper starting...".bright_magenta().bold());
    println!("📡 Backend: {}", config.backend_url.cyan());
    println!("🔗 Tracking: {}", config.scrape_url.cyan());

    let source = Box::new(HttpPageSource::new(&config)?);
    let tracker = DedupTracker::new();
    let client = RelayClient::new(&config)?;

    // Source, tracker, and client live as long as the process; session
    // restarts inside the loop never reset the tracker.
    let mut pipeline = IngestionLoop::new(source, tracker, client, config);

    tokio::select! {
        result = pipeline.run() => result?,
        _ = signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
    }

    println!("{}", "👋 Bye".yellow());
    Ok(())
}

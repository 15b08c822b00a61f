use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use basetrack::core::config::RelayConfig;
use basetrack::relay::{self, AppState};

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

    let config = RelayConfig::from_env();
    info!("🚀 Base token relay starting");

    let state = AppState::new(&config);
    let sweeper = state.store.start_sweeper(config.sweep_interval);

    tokio::select! {
        result = relay::serve(config, state.clone()) => {
            if let Err(e) = &result {
                error!(error = %e, "relay server exited with error");
            }
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
    }

    sweeper.abort();
    info!("👋 Relay shutdown complete");
    Ok(())
}

mod config;
mod donation;
mod error;
mod messaging;
mod server;
#[cfg(test)]
mod test_logs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::BridgeConfig;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saweria_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An optional TOML file may be passed; the environment always wins.
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    info!("Starting Saweria to Roblox Bridge...");
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config =
        BridgeConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!(
        "Universe ID: {}",
        config.universe_id.as_deref().unwrap_or("Not configured")
    );
    info!(
        "API Key: {}",
        if config.api_key_configured() {
            "Configured"
        } else {
            "Missing"
        }
    );

    if !config.is_ready() {
        warn!("Webhooks will be rejected until ROBLOX_API_KEY and UNIVERSE_ID are set");
    }

    server::run(AppState::new(config)).await
}

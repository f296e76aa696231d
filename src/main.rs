mod auth;
mod backend;
mod config;
mod delivery;
mod heartbeat;
mod normalize;
mod payload;
mod platform;
mod router;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Configuration loaded from: {}", config_path.display());
    info!("  Webhook URL: {}", config.backend.webhook_url);
    info!("  Allowed roles: {:?}", config.allowed_role_ids());
    info!(
        "  Verification guild: {:?}",
        config.discord.verification_guild_id
    );
    info!("  Backend timeout: {}ms", config.backend.timeout_ms);

    info!("Bot is starting...");
    platform::discord::run(config).await?;

    info!("Shutdown complete");
    Ok(())
}

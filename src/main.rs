use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use ping_booster::{api, Engine, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let config_path = std::env::var("PING_BOOSTER_CONFIG").unwrap_or_else(|_| "config.json".into());
    let config = ServerConfig::load(&config_path)?;
    info!("Configuration: {} ({} test servers)", config_path, config.servers.len());

    let api_port = config.api_port;
    let engine = Arc::new(Engine::new(config));

    tokio::spawn(async move {
        if let Err(e) = api::start_server(api_port, engine).await {
            tracing::error!("API server failed: {}", e);
        }
    });

    signal::ctrl_c().await?;
    info!("Shutdown signal received. Closing PingBooster...");

    Ok(())
}

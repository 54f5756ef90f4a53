//! NEWSDESK: multi-source market news aggregation and ranking.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires providers into the aggregator and serves the HTTP API until
//! Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use newsdesk::aggregator::NewsAggregator;
use newsdesk::config::AppConfig;
use newsdesk::server;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("NEWSDESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load_or_default(&config_path)?;

    info!(
        config = %config_path,
        port = cfg.server.port,
        cache_ttl_secs = cfg.cache.ttl_secs,
        "NEWSDESK starting up"
    );

    let aggregator = Arc::new(NewsAggregator::from_config(&cfg)?);

    server::serve(aggregator, cfg.server.port, shutdown_signal()).await?;

    info!("NEWSDESK shut down cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received.");
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("newsdesk=info"));

    let json_logging = std::env::var("NEWSDESK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

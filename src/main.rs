//! Legacy API bridge.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  LEGACY BRIDGE                   │
//!                          │                                                  │
//!   GET /v1/...            │  ┌────────┐                                      │
//!   ───────────────────────┼─▶│  http  │──── v1 ───────────────┐              │
//!                          │  │ server │                       │              │
//!   GET /v2/...            │  │        │── v2 ─▶┌─────────┐    │              │
//!   ───────────────────────┼─▶│        │        │  cache  │    ▼              │
//!                          │  └────────┘        └────┬────┘ ┌──────────┐      │
//!                          │       │            miss │      │ upstream │      │    Legacy
//!                          │       │                 └─────▶│  client  │──────┼──▶ Service
//!                          │       │          ┌───────────┐ │ + breaker│      │
//!                          │       │          │ transform │◀┤ + retries│      │
//!                          │       │          └───────────┘ └──────────┘      │
//!   GET /health            │       ▼                              ▲           │
//!   ───────────────────────┼─▶ reporter ◀── probe ───────────────┘           │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use legacy_bridge::config::load_config;
use legacy_bridge::lifecycle::{self, wait_for_signal, Shutdown};
use legacy_bridge::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "legacy-bridge")]
#[command(about = "Versioned, cached, circuit-broken front for a legacy API", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment overrides apply without it.
    #[arg(short, long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_logging(&config.observability)?;
    tracing::info!("legacy-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        legacy = %config.legacy.base_url,
        timeout_ms = config.legacy.request_timeout_ms,
        max_retries = config.legacy.max_retries,
        cache_ttl_secs = config.cache.ttl_secs,
        breaker_threshold = config.circuit_breaker.failure_threshold,
        breaker_reset_ms = config.circuit_breaker.reset_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    lifecycle::run(config, listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

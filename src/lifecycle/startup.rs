//! Startup orchestration.
//!
//! Builds the shared pieces in dependency order (breaker and passive health
//! first, then the client, then everything that holds the client), starts
//! the background tasks and serves until shutdown.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::ResponseCache;
use crate::config::BridgeConfig;
use crate::health::{HealthReporter, PassiveHealth, UpstreamProbe};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::resilience::CircuitBreaker;
use crate::routing::{Bridge, V2Data};
use crate::upstream::{LegacyClient, UpstreamError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot build legacy client: {0}")]
    Client(#[from] UpstreamError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the server and its background tasks share.
pub struct Components {
    pub state: AppState,
    pub probe: Arc<UpstreamProbe>,
    pub cache: Arc<ResponseCache<V2Data>>,
}

pub fn assemble(config: &BridgeConfig) -> Result<Components, StartupError> {
    let breaker = Arc::new(CircuitBreaker::from_config(&config.circuit_breaker));
    let passive = Arc::new(PassiveHealth::new());
    let client = LegacyClient::new(&config.legacy, breaker.clone(), passive.clone())?;

    let bridge = Arc::new(Bridge::from_config(client.clone(), &config.cache));
    let cache = bridge.cache().clone();
    let probe = Arc::new(UpstreamProbe::new(client, config.health.clone()));
    let health = Arc::new(HealthReporter::new(
        breaker,
        passive,
        config.health.probe_enabled.then(|| probe.clone()),
        cache.clone(),
        config.health.clone(),
    ));

    Ok(Components {
        state: AppState { bridge, health },
        probe,
        cache,
    })
}

/// Serve on `listener` until `shutdown` fires, then stop the background tasks.
pub async fn run(
    config: BridgeConfig,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let components = assemble(&config)?;

    let sweeper = components.cache.clone().spawn_sweeper(
        Duration::from_secs(config.cache.sweep_interval_secs),
        shutdown.subscribe(),
    );
    let probe = tokio::spawn(components.probe.clone().run(shutdown.subscribe()));

    let served = HttpServer::new(config, components.state)
        .run(listener, shutdown.subscribe())
        .await;

    // The server may have stopped on its own; make sure the tasks follow.
    shutdown.trigger();
    for task in [sweeper, probe] {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }

    served.map_err(StartupError::from)
}

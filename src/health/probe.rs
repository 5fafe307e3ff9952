//! Active reachability probe for the legacy service.
//!
//! # Responsibilities
//! - Periodically GET the configured probe path on the legacy base URL
//! - Publish the latest result as an atomically swapped snapshot
//!
//! The probe bypasses the circuit breaker and the retry loop: it must keep
//! observing the upstream while the breaker is open.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::HealthConfig;
use crate::observability::metrics;
use crate::upstream::{LegacyClient, UpstreamError};

/// Result of the most recent probe plus what earlier probes left behind.
#[derive(Debug, Clone)]
pub struct ProbeSnapshot {
    pub checked_at: Instant,
    pub checked_at_utc: DateTime<Utc>,
    pub reachable: bool,
    pub latency: Duration,
    pub error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure: Option<Instant>,
}

pub struct UpstreamProbe {
    client: LegacyClient,
    config: HealthConfig,
    latest: ArcSwapOption<ProbeSnapshot>,
}

impl UpstreamProbe {
    pub fn new(client: LegacyClient, config: HealthConfig) -> Self {
        Self {
            client,
            config,
            latest: ArcSwapOption::empty(),
        }
    }

    pub fn latest(&self) -> Option<Arc<ProbeSnapshot>> {
        self.latest.load_full()
    }

    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.probe_enabled {
            tracing::info!("Upstream probe disabled");
            return;
        }

        tracing::info!(
            interval = self.config.probe_interval_secs,
            path = %self.config.probe_path,
            "Upstream probe starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.probe_interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Upstream probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe once and publish the result.
    pub async fn check(&self) -> Arc<ProbeSnapshot> {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        let started = Instant::now();
        let result = self.client.probe(&self.config.probe_path, timeout).await;
        let latency = started.elapsed();

        let error = match result {
            // Any non-5xx answer means the service is up and talking.
            Ok(_) | Err(UpstreamError::NotFound(_)) | Err(UpstreamError::Client(_)) => None,
            Err(e) => {
                tracing::warn!(path = %self.config.probe_path, error = %e, "Upstream probe failed");
                Some(e.to_string())
            }
        };
        self.record(latency, error)
    }

    pub(crate) fn record(&self, latency: Duration, error: Option<String>) -> Arc<ProbeSnapshot> {
        let previous = self.latest.load_full();
        let now = Instant::now();
        let now_utc = Utc::now();
        let reachable = error.is_none();

        let snapshot = Arc::new(ProbeSnapshot {
            checked_at: now,
            checked_at_utc: now_utc,
            reachable,
            latency,
            error,
            last_success_at: if reachable {
                Some(now_utc)
            } else {
                previous.as_ref().and_then(|p| p.last_success_at)
            },
            last_failure: if reachable {
                previous.as_ref().and_then(|p| p.last_failure)
            } else {
                Some(now)
            },
        });

        if previous.as_ref().map(|p| p.reachable) != Some(reachable) {
            tracing::info!(reachable, "Upstream reachability changed");
        }
        metrics::record_upstream_reachable(reachable);
        self.latest.store(Some(snapshot.clone()));
        snapshot
    }
}

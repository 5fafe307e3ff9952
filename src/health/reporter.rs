//! Health aggregation for `/health` and the Kubernetes-style probes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::cache::{CacheStatus, ResponseCache};
use crate::config::HealthConfig;
use crate::health::passive::PassiveHealth;
use crate::health::probe::UpstreamProbe;
use crate::health::state::HealthStatus;
use crate::resilience::{BreakerStatus, CircuitBreaker, CircuitState};
use crate::routing::V2Data;

/// How the legacy service looks from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamState {
    Up,
    Slow,
    Flapping,
    Down,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyApiHealth {
    pub status: UpstreamState,
    pub circuit_breaker: BreakerStatus,
    pub latency_ms: Option<u64>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: CacheStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Services {
    pub legacy_api: LegacyApiHealth,
    pub cache: CacheHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub services: Services,
    /// Seconds since the bridge started.
    pub uptime: u64,
}

/// One reachability observation, whichever source it came from.
struct Signal {
    at: Instant,
    reachable: bool,
    /// Unknown for a passive failure.
    latency: Option<Duration>,
}

pub struct HealthReporter {
    breaker: Arc<CircuitBreaker>,
    passive: Arc<PassiveHealth>,
    probe: Option<Arc<UpstreamProbe>>,
    cache: Arc<ResponseCache<V2Data>>,
    config: HealthConfig,
    started: Instant,
}

impl HealthReporter {
    pub fn new(
        breaker: Arc<CircuitBreaker>,
        passive: Arc<PassiveHealth>,
        probe: Option<Arc<UpstreamProbe>>,
        cache: Arc<ResponseCache<V2Data>>,
        config: HealthConfig,
    ) -> Self {
        Self {
            breaker,
            passive,
            probe,
            cache,
            config,
            started: Instant::now(),
        }
    }

    pub fn breaker_status(&self) -> BreakerStatus {
        self.breaker.status()
    }

    pub fn report(&self) -> HealthReport {
        let breaker = self.breaker.status();
        let upstream = self.upstream_state();
        let status = overall(breaker.state, upstream);

        let probe = self.probe.as_ref().and_then(|p| p.latest());
        let passive = self.passive.last_success();
        let latency = self.freshest_signal().and_then(|s| s.latency);
        let last_success_at = match (
            probe.as_ref().and_then(|p| p.last_success_at),
            passive.as_ref().map(|p| p.at_utc),
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        HealthReport {
            status,
            timestamp: Utc::now(),
            services: Services {
                legacy_api: LegacyApiHealth {
                    status: upstream,
                    circuit_breaker: breaker,
                    latency_ms: latency.map(|l| l.as_millis() as u64),
                    last_checked_at: probe.as_ref().map(|p| p.checked_at_utc),
                    last_success_at,
                },
                cache: CacheHealth {
                    status: "up",
                    stats: self.cache.status(),
                },
            },
            uptime: self.started.elapsed().as_secs(),
        }
    }

    pub fn status(&self) -> HealthStatus {
        overall(self.breaker.state(), self.upstream_state())
    }

    pub fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    fn stale_after(&self) -> Duration {
        Duration::from_secs(self.config.stale_after_secs)
    }

    /// The newest probe or passive observation still inside the stale window.
    fn freshest_signal(&self) -> Option<Signal> {
        let window = self.stale_after();
        let probe = self
            .probe
            .as_ref()
            .and_then(|p| p.latest())
            .filter(|s| s.checked_at.elapsed() <= window)
            .map(|s| Signal {
                at: s.checked_at,
                reachable: s.reachable,
                latency: Some(s.latency),
            });

        let failure = |at: Instant| Signal {
            at,
            reachable: false,
            latency: None,
        };
        let passive = match (
            self.passive.recent_success(window),
            self.passive.recent_failure(window),
        ) {
            (Some(ok), Some(failed)) if failed > ok.at => Some(failure(failed)),
            (Some(ok), _) => Some(Signal {
                at: ok.at,
                reachable: true,
                latency: Some(ok.latency),
            }),
            (None, failed) => failed.map(failure),
        };

        match (probe, passive) {
            (Some(p), Some(q)) => Some(if q.at > p.at { q } else { p }),
            (p, q) => p.or(q),
        }
    }

    fn upstream_state(&self) -> UpstreamState {
        let Some(signal) = self.freshest_signal() else {
            return UpstreamState::Unknown;
        };
        let window = self.stale_after();

        if !signal.reachable {
            // Failing right after a success inside the window is intermittent.
            return if self.passive.recent_success(window).is_some() {
                UpstreamState::Flapping
            } else {
                UpstreamState::Down
            };
        }
        if signal
            .latency
            .is_some_and(|l| l >= Duration::from_millis(self.config.slow_threshold_ms))
        {
            return UpstreamState::Slow;
        }

        let probe_failed = self
            .probe
            .as_ref()
            .and_then(|p| p.latest())
            .and_then(|s| s.last_failure)
            .is_some_and(|at| at.elapsed() <= window);
        if probe_failed || self.passive.recent_failure(window).is_some() {
            UpstreamState::Flapping
        } else {
            UpstreamState::Up
        }
    }
}

fn overall(breaker: CircuitState, upstream: UpstreamState) -> HealthStatus {
    let from_breaker = match breaker {
        CircuitState::Closed => HealthStatus::Healthy,
        CircuitState::HalfOpen => HealthStatus::Degraded,
        CircuitState::Open => HealthStatus::Unhealthy,
    };
    let from_upstream = match upstream {
        UpstreamState::Up => HealthStatus::Healthy,
        UpstreamState::Slow | UpstreamState::Flapping | UpstreamState::Unknown => {
            HealthStatus::Degraded
        }
        UpstreamState::Down => HealthStatus::Unhealthy,
    };
    from_breaker.worst(from_upstream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LegacyConfig;
    use crate::upstream::LegacyClient;

    struct Fixture {
        breaker: Arc<CircuitBreaker>,
        passive: Arc<PassiveHealth>,
        probe: Arc<UpstreamProbe>,
        reporter: HealthReporter,
    }

    fn fixture(with_probe: bool) -> Fixture {
        let breaker = Arc::new(CircuitBreaker::new(3, Duration::from_secs(30)));
        let passive = Arc::new(PassiveHealth::new());
        let client = LegacyClient::new(&LegacyConfig::default(), breaker.clone(), passive.clone()).unwrap();
        let probe = Arc::new(UpstreamProbe::new(client, HealthConfig::default()));
        let reporter = HealthReporter::new(
            breaker.clone(),
            passive.clone(),
            with_probe.then(|| probe.clone()),
            Arc::new(ResponseCache::new(10)),
            HealthConfig::default(),
        );
        Fixture {
            breaker,
            passive,
            probe,
            reporter,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_is_degraded() {
        let f = fixture(false);
        assert_eq!(f.reporter.status(), HealthStatus::Degraded);
        assert!(f.reporter.is_ready());
        assert_eq!(f.reporter.report().services.legacy_api.status, UpstreamState::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_fast_success_is_healthy_until_stale() {
        let f = fixture(false);
        f.passive.record_success(Duration::from_millis(20));
        assert_eq!(f.reporter.status(), HealthStatus::Healthy);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(f.reporter.status(), HealthStatus::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_upstream_is_degraded() {
        let f = fixture(false);
        f.passive.record_success(Duration::from_millis(1500));
        let report = f.reporter.report();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.services.legacy_api.status, UpstreamState::Slow);
        assert_eq!(report.services.legacy_api.latency_ms, Some(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_is_unhealthy() {
        let f = fixture(false);
        f.passive.record_success(Duration::from_millis(20));
        for _ in 0..3 {
            f.breaker.try_acquire().unwrap().record_failure();
        }
        assert_eq!(f.reporter.status(), HealthStatus::Unhealthy);
        assert!(!f.reporter.is_ready());

        tokio::time::advance(Duration::from_secs(30)).await;
        let trial = f.breaker.try_acquire().unwrap();
        assert_eq!(f.reporter.status(), HealthStatus::Degraded, "half-open");
        trial.record_success();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_after_recent_success_are_flapping() {
        let f = fixture(false);
        f.passive.record_success(Duration::from_millis(20));

        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..2 {
            f.breaker.try_acquire().unwrap().record_failure();
            f.passive.record_failure();
        }
        let report = f.reporter.report();
        assert_eq!(report.services.legacy_api.status, UpstreamState::Flapping);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.services.legacy_api.latency_ms, None);

        // A success that follows is still shaky while the failure is recent.
        tokio::time::advance(Duration::from_secs(1)).await;
        f.passive.record_success(Duration::from_millis(20));
        assert_eq!(f.reporter.report().services.legacy_api.status, UpstreamState::Flapping);

        tokio::time::advance(Duration::from_secs(61)).await;
        f.passive.record_success(Duration::from_millis(20));
        assert_eq!(f.reporter.status(), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_without_success_are_down() {
        let f = fixture(false);
        f.passive.record_failure();
        let report = f.reporter.report();
        assert_eq!(report.services.legacy_api.status, UpstreamState::Down);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!f.reporter.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_signals() {
        let f = fixture(true);

        f.probe.record(Duration::from_millis(10), Some("refused".into()));
        assert_eq!(f.reporter.status(), HealthStatus::Unhealthy);

        // Newer passive success beats the older failed probe, but the
        // recent failure marks the upstream as flapping.
        tokio::time::advance(Duration::from_secs(1)).await;
        f.passive.record_success(Duration::from_millis(10));
        let report = f.reporter.report();
        assert_eq!(report.services.legacy_api.status, UpstreamState::Flapping);
        assert_eq!(report.status, HealthStatus::Degraded);

        tokio::time::advance(Duration::from_secs(61)).await;
        f.probe.record(Duration::from_millis(10), None);
        assert_eq!(f.reporter.status(), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_shape() {
        let f = fixture(true);
        f.probe.record(Duration::from_millis(12), None);
        let body = serde_json::to_value(f.reporter.report()).unwrap();

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["legacyApi"]["status"], "up");
        assert_eq!(body["services"]["legacyApi"]["circuitBreaker"]["state"], "closed");
        assert_eq!(body["services"]["legacyApi"]["latencyMs"], 12);
        assert_eq!(body["services"]["cache"]["status"], "up");
        assert_eq!(body["services"]["cache"]["entries"], 0);
        assert!(body["uptime"].is_u64());
        assert!(body["timestamp"].is_string());
    }
}

//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probe (probe.rs):
//!     Periodic timer
//!     → GET {base_url}{probe_path}, no breaker, no retries
//!     → Swap in the latest ProbeSnapshot
//!
//! Passive signal (passive.rs):
//!     Upstream client outcome
//!     → Last success (time, latency) / consecutive failures
//!
//! Aggregation (reporter.rs):
//!     Breaker state + freshest reachability signal + cache stats
//!     → state.rs HealthStatus (healthy / degraded / unhealthy)
//! ```
//!
//! # Design Decisions
//! - Signals older than `stale_after_secs` are ignored
//! - Liveness never looks at the upstream; readiness is "not unhealthy"

pub mod passive;
pub mod probe;
pub mod reporter;
pub mod state;

pub use passive::PassiveHealth;
pub use probe::{ProbeSnapshot, UpstreamProbe};
pub use reporter::{HealthReport, HealthReporter, UpstreamState};
pub use state::HealthStatus;

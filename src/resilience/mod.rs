//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call:
//!     → circuit_breaker.rs (acquire a permit, or fail fast)
//!     → retries.rs (per-attempt timeout clamped to the sequence budget)
//!     → On retryable failure: backoff.rs (exponential delay + jitter), loop
//!     → circuit_breaker.rs (record the attempt outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Retries only for idempotent requests (the bridge only issues GETs)
//! - Circuit breaker prevents cascading failures
//! - Breaker is gated per attempt, so a retry never bypasses an open circuit

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use backoff::Backoff;
pub use circuit_breaker::{BreakerError, BreakerStatus, CallPermit, CircuitBreaker, CircuitState};
pub use retries::{RetryDeadline, RetryPolicy};

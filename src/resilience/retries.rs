//! Retry policy.
//!
//! # Responsibilities
//! - Bound the number of attempts per upstream call
//! - Bound the total wall time of an attempt sequence
//! - Compute per-attempt timeouts clamped to what is left of the budget
//!
//! # Design Decisions
//! - Only idempotent (GET) calls reach this policy
//! - Classification of retryable errors lives on `UpstreamError`
//! - The sequence is an explicit loop owned by the client, not nested closures

use std::time::Duration;

use tokio::time::Instant;

use crate::config::LegacyConfig;
use crate::resilience::backoff::Backoff;

/// Retry settings for one upstream call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Deadline for a single attempt.
    pub attempt_timeout: Duration,
    /// Deadline for the whole sequence, backoff included.
    pub budget: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn from_config(config: &LegacyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            attempt_timeout: Duration::from_millis(config.request_timeout_ms),
            budget: Duration::from_millis(config.retry_budget_ms),
            backoff: Backoff::from_config(config),
        }
    }

    /// Total attempts allowed, first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Start the clock for one attempt sequence.
    pub fn start(&self) -> RetryDeadline {
        RetryDeadline {
            expires_at: Instant::now() + self.budget,
        }
    }
}

/// Wall-clock bound on an attempt sequence.
#[derive(Debug, Clone, Copy)]
pub struct RetryDeadline {
    expires_at: Instant,
}

impl RetryDeadline {
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Timeout for the next attempt: the attempt timeout, clamped to what is left.
    pub fn attempt_timeout(&self, policy: &RetryPolicy) -> Duration {
        policy.attempt_timeout.min(self.remaining())
    }

    /// Whether sleeping `delay` still leaves time for another attempt.
    pub fn allows(&self, delay: Duration) -> bool {
        self.remaining() > delay
    }
}

//! Passive health signal from real upstream traffic.
//!
//! # Responsibilities
//! - Observe upstream call outcomes
//! - Remember the last successful call (when, how fast)
//! - Remember when the last failed call happened
//! - Track consecutive failures
//!
//! # Design Decisions
//! - Only connection errors, timeouts and 5xx count as failures
//! - 4xx are NOT failures (the upstream answered)
//! - Lock-free: the last success is swapped atomically, counters are atomics

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// The most recent successful upstream exchange.
#[derive(Debug, Clone)]
pub struct SuccessRecord {
    pub at: Instant,
    pub at_utc: DateTime<Utc>,
    pub latency: Duration,
}

/// Outcome tracker fed by the upstream client.
#[derive(Debug, Default)]
pub struct PassiveHealth {
    last_success: ArcSwapOption<SuccessRecord>,
    last_failure: ArcSwapOption<Instant>,
    consecutive_failures: AtomicU32,
}

impl PassiveHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.last_success.store(Some(Arc::new(SuccessRecord {
            at: Instant::now(),
            at_utc: Utc::now(),
            latency,
        })));
    }

    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        self.last_failure.store(Some(Arc::new(Instant::now())));
    }

    pub fn last_success(&self) -> Option<Arc<SuccessRecord>> {
        self.last_success.load_full()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Last success, if it happened within `window`.
    pub fn recent_success(&self, window: Duration) -> Option<Arc<SuccessRecord>> {
        self.last_success()
            .filter(|record| record.at.elapsed() <= window)
    }

    /// When the last failure happened, if within `window`.
    pub fn recent_failure(&self, window: Duration) -> Option<Instant> {
        self.last_failure
            .load_full()
            .map(|at| *at)
            .filter(|at| at.elapsed() <= window)
    }
}

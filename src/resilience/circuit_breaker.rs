//! Circuit breaker for the legacy upstream.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: exactly one trial request tests whether the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: reset timeout elapsed since the last failure (checked on acquire)
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails (timer restarts)
//! ```
//!
//! # Design Decisions
//! - One instance per bridge, injected; never a global
//! - Fail fast in Open state (no network attempt at all)
//! - Single trial in Half-Open (prevents hammering a recovering upstream)
//! - Permits are guards: a trial dropped without an outcome frees the trial slot

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    #[error("circuit open, retry in {}ms", .retry_after.as_millis())]
    Open { retry_after: Duration },

    #[error("circuit half-open, trial call already in flight")]
    TrialInFlight,
}

/// Read-only view for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    trial_in_flight: bool,
}

/// Three-state circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        metrics::record_circuit_state(CircuitState::Closed);
        Self {
            threshold: threshold.max(1),
            reset_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                last_failure_time: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_millis(config.reset_timeout_ms),
        )
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Ask permission for one upstream attempt.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, BreakerError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(self.reset_timeout);
                if elapsed >= self.reset_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.trial_in_flight = true;
                    Ok(CallPermit::new(self, true))
                } else {
                    Err(BreakerError::Open {
                        retry_after: self.reset_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(BreakerError::TrialInFlight)
                } else {
                    inner.trial_in_flight = true;
                    Ok(CallPermit::new(self, true))
                }
            }
        }
    }

    /// Current state, failure count and last failure time. Never mutates.
    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        BreakerStatus {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure_time: inner.last_failure_time,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen if trial => {
                inner.trial_in_flight = false;
                inner.failure_count = 0;
                self.transition(&mut inner, CircuitState::Closed);
            }
            // Outcomes of calls admitted before the circuit opened are stale.
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.last_failure = Some(Instant::now());
                inner.last_failure_time = Some(Utc::now());
                if inner.failure_count >= self.threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen if trial => {
                inner.trial_in_flight = false;
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.last_failure = Some(Instant::now());
                inner.last_failure_time = Some(Utc::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            _ => {}
        }
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
            tracing::debug!("Half-open trial abandoned; slot released");
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;

        match to {
            CircuitState::Open => tracing::warn!(
                from = %from,
                failures = inner.failure_count,
                reset_timeout_ms = self.reset_timeout.as_millis() as u64,
                "Circuit opened"
            ),
            CircuitState::HalfOpen => tracing::info!("Circuit half-open, admitting trial call"),
            CircuitState::Closed => tracing::info!(from = %from, "Circuit closed"),
        }
        metrics::record_circuit_transition(from, to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is plain data updated atomically under the lock; a panic
        // elsewhere cannot leave it half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission for one upstream attempt. Report the outcome with
/// [`CallPermit::record_success`] or [`CallPermit::record_failure`].
#[must_use = "a permit must report the attempt outcome"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// Whether this is the single half-open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_secs(30))
    }

    fn fail(cb: &CircuitBreaker) {
        cb.try_acquire().unwrap().record_failure();
    }

    #[test]
    fn test_opens_after_exactly_threshold_failures() {
        let cb = breaker();
        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.status().failure_count, 2);

        fail(&cb);
        let status = cb.status();
        assert_eq!(status.state, CircuitState::Open);
        assert_eq!(status.failure_count, 3);
        assert!(status.last_failure_time.is_some());
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let cb = breaker();
        fail(&cb);
        fail(&cb);
        cb.try_acquire().unwrap().record_success();
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.status().failure_count, 1);
    }

    #[test]
    fn test_open_fails_fast() {
        let cb = breaker();
        for _ in 0..3 {
            fail(&cb);
        }
        for _ in 0..5 {
            assert!(matches!(cb.try_acquire(), Err(BreakerError::Open { .. })));
        }
        assert_eq!(cb.status().failure_count, 3);
    }

    #[test]
    fn test_status_is_read_only() {
        let cb = breaker();
        fail(&cb);
        let before = cb.status();
        for _ in 0..10 {
            assert_eq!(cb.status(), before);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_one_trial() {
        let cb = breaker();
        for _ in 0..3 {
            fail(&cb);
        }

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cb.try_acquire().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        let trial = cb.try_acquire().expect("trial should be admitted");
        assert!(trial.is_trial());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        for _ in 0..5 {
            assert_eq!(cb.try_acquire().unwrap_err(), BreakerError::TrialInFlight);
        }

        trial.record_success();
        let status = cb.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, 0);
        assert!(cb.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens_and_restarts_timer() {
        let cb = breaker();
        for _ in 0..3 {
            fail(&cb);
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        cb.try_acquire().unwrap().record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // Timer restarted at the trial failure, not the original one.
        tokio::time::advance(Duration::from_secs(20)).await;
        match cb.try_acquire() {
            Err(BreakerError::Open { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(10))
            }
            other => panic!("expected open, got {:?}", other.map(|p| p.is_trial())),
        }

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(cb.try_acquire().unwrap().is_trial());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_trial_frees_slot() {
        let cb = breaker();
        for _ in 0..3 {
            fail(&cb);
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        let trial = cb.try_acquire().unwrap();
        drop(trial);
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let second = cb.try_acquire().expect("slot should be free again");
        assert!(second.is_trial());
        second.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_outcomes_are_ignored() {
        let cb = breaker();
        let early = cb.try_acquire().unwrap();
        for _ in 0..3 {
            fail(&cb);
        }
        early.record_success();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.status().failure_count, 3);
    }

    #[test]
    fn test_concurrent_half_open_admits_single_trial() {
        let cb = CircuitBreaker::new(1, Duration::ZERO);
        fail(&cb);

        let admitted = AtomicUsize::new(0);
        let barrier = Barrier::new(16);
        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    let permit = cb.try_acquire();
                    if permit.is_ok() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                    // Hold permits until every thread has tried.
                    barrier.wait();
                    if let Ok(p) = permit {
                        p.record_success();
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}

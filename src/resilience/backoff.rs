//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::LegacyConfig;

/// Backoff schedule for upstream retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    pub fn from_config(config: &LegacyConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    ///
    /// Doubles per retry and saturates at the configured maximum.
    pub fn ceiling(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay before retry number `retry` with up to 25% random jitter added.
    pub fn delay(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling(retry);
        let jitter_range = ceiling.as_millis() as u64 / 4;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };
        ceiling + Duration::from_millis(jitter)
    }
}

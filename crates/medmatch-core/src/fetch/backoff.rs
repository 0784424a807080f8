//! Retry delay policy.
//!
//! [`RetryPolicy::delay`] is a pure function of the attempt number, the class
//! of failure, and a caller-supplied RNG. Sleeping is left to the caller.

use std::time::Duration;

use rand::Rng;

use crate::config::MatchConfig;

/// Kind of failure that triggered a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeout, connection reset, unreadable body
    Network,
    /// 403 from the catalog
    Blocked,
    /// 429 from the catalog
    RateLimited,
}

/// Retry budget and delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Base delay; doubled per attempt for network failures.
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to every delay.
    pub max_jitter: Duration,
    /// Fixed wait after a 429.
    pub rate_limited_delay: Duration,
}

/// Cap on the exponent so a large attempt number cannot overflow.
const MAX_BACKOFF_SHIFT: u32 = 6;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &MatchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_jitter: Duration::from_millis(config.retry_max_jitter_ms),
            rate_limited_delay: Duration::from_millis(config.rate_limited_delay_ms),
        }
    }

    /// Delay before the next attempt after `attempt` (1-based) failed with `class`.
    ///
    /// - `Network`: `base * 2^(attempt - 1) + jitter`
    /// - `Blocked`: `base + jitter` (the header profile changes instead)
    /// - `RateLimited`: `rate_limited_delay + jitter`
    pub fn delay<R: Rng>(&self, attempt: u32, class: ErrorClass, rng: &mut R) -> Duration {
        let fixed = match class {
            ErrorClass::Network => {
                let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
                self.base_delay.saturating_mul(1 << shift)
            }
            ErrorClass::Blocked => self.base_delay,
            ErrorClass::RateLimited => self.rate_limited_delay,
        };
        fixed.saturating_add(self.jitter(rng))
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    fn jitter<R: Rng>(&self, rng: &mut R) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.gen_range(0..=max_ms))
    }
}

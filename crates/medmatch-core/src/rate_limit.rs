//! Minimum-interval rate limiter shared by concurrent pipeline tasks.
//!
//! Each downstream target gets its own [`RateLimiter`]; instances never share
//! state. The internal lock is held across the wait, so concurrent callers
//! are admitted one at a time, each at least one interval after the last.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum interval between calls.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing at most `max_calls_per_second` calls.
    ///
    /// A non-positive or non-finite rate disables limiting.
    pub fn new(max_calls_per_second: f64) -> Self {
        let min_interval = if max_calls_per_second.is_finite() && max_calls_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / max_calls_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Minimum interval between two admitted calls.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the interval since the last admitted call has elapsed,
    /// then record this call.
    pub async fn wait_if_needed(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "rate limiter waiting"
                );
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

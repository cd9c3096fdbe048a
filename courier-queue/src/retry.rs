//! Retry policy and exponential backoff with jitter

use std::time::{Duration, SystemTime};

use rand::Rng;
use serde::{Deserialize, Serialize};

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    2_000 // first retry after 2 seconds, then 4s, 8s, ...
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_jitter_factor() -> f64 {
    0.2 // ±20%
}

/// Bounded-retry policy for delivery jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts before the job is dropped
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff (in milliseconds)
    ///
    /// The first retry occurs after this delay; each subsequent retry
    /// doubles it, up to `max_delay_ms`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on the backoff delay (in milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor (0.0 to 1.0) applied to each delay to prevent
    /// thundering herd
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryPolicy {
    /// When the next retry should occur after the given 1-indexed attempt
    ///
    /// `delay = min(base * 2^(attempt - 1), max_delay) * (1 ± jitter)`
    #[must_use]
    pub fn next_attempt_at(&self, attempt: u32) -> SystemTime {
        SystemTime::now() + self.delay_for(attempt)
    }

    /// The backoff delay after the given 1-indexed attempt
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay_ms = if exponent >= 63 {
            // 2^63 would overflow the multiplier
            self.max_delay_ms
        } else {
            let multiplier = 1u64 << exponent;
            self.base_delay_ms
                .saturating_mul(multiplier)
                .min(self.max_delay_ms)
        };

        // Intentional precision loss and casting for randomization
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let jittered_ms = {
            let jitter_range = (delay_ms as f64) * self.jitter_factor;
            if jitter_range > 0.0 {
                let mut rng = rand::rng();
                let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
                ((delay_ms as f64) + jitter).max(0.0) as u64
            } else {
                delay_ms
            }
        };

        Duration::from_millis(jittered_ms)
    }
}

use std::time::Duration;

use rand::Rng;

use jobsparser_common::RetryConfig;

/// Largest fraction added on top of a delay as jitter.
pub const MAX_JITTER: f64 = 0.25;

/// Exponential backoff: `base * 2^min(attempt, cap_exponent) * (1 + U(0, 0.25))`,
/// never longer than `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    cap_exponent: u32,
    max_delay: Duration,
}

impl Backoff {
    pub fn new(cap_exponent: u32, max_delay: Duration) -> Self {
        Self {
            cap_exponent,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.cap_exponent, config.max_delay)
    }

    /// Delay before the call numbered `attempt` (0 = first try at an offset).
    pub fn next_delay(&self, attempt: u32, base_sleep: Duration) -> Duration {
        let jitter = rand::rng().random_range(0.0..=MAX_JITTER);
        self.scaled(attempt, base_sleep, 1.0 + jitter)
    }

    /// The delay with jitter stripped; the lower bound of `next_delay`.
    pub fn undithered(&self, attempt: u32, base_sleep: Duration) -> Duration {
        self.scaled(attempt, base_sleep, 1.0)
    }

    fn scaled(&self, attempt: u32, base_sleep: Duration, jitter_factor: f64) -> Duration {
        let exponent = attempt.min(self.cap_exponent).min(i32::MAX as u32) as i32;
        let secs = base_sleep.as_secs_f64() * 2f64.powi(exponent) * jitter_factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

//! Exponential backoff with jitter for failed deliveries.

use std::time::Duration;

use rand::RngExt;

/// How failed deliveries of one (event, registration) pair are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a pipeline makes at most `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each following retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay, jitter included.
    pub max_delay: Duration,
    /// Jitter fraction (0.0 to 1.0) applied as ± randomisation.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.1,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            delay: self.delay_after(attempt),
        }
    }

    /// Backoff before the attempt following `attempt`: `base * 2^(attempt-1)`, capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let uncapped = self.base_delay.saturating_mul(2_u32.saturating_pow(exponent));
        let capped = uncapped.min(self.max_delay);
        apply_jitter(capped, self.jitter_factor).min(self.max_delay)
    }
}

fn apply_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    let factor = jitter_factor.clamp(0.0, 1.0);
    if factor == 0.0 || duration.is_zero() {
        return duration;
    }

    let mut rng = rand::rng();
    let spread = duration.as_secs_f64() * factor;
    let offset = rng.random_range(-spread..=spread);
    Duration::from_secs_f64((duration.as_secs_f64() + offset).max(0.0))
}

use std::time::Duration;

use serde::Deserialize;

use hookline_core::config::Config;

use crate::delivery::recorder::RecordPolicy;
use crate::delivery::retry::RetryPolicy;

/// Webhooks service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhooksConfig {
    /// Database connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3114). Env var: `WEBHOOKS_PORT`.
    #[serde(default = "default_port")]
    pub webhooks_port: u16,
    /// Apply pending migrations before serving (default true).
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
    /// Per-attempt timeout for event deliveries.
    #[serde(default = "default_timeout_ms")]
    pub delivery_timeout_ms: u64,
    /// Timeout for ad hoc connectivity tests.
    #[serde(default = "default_timeout_ms")]
    pub test_timeout_ms: u64,
    /// Retries after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Fraction (0.0–1.0) of random spread applied to each backoff delay.
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,
    /// Number of worker tasks draining the delivery queue.
    #[serde(default = "default_delivery_workers")]
    pub delivery_workers: usize,
    /// Bound of the delivery queue; enqueueing waits once it is full.
    #[serde(default = "default_delivery_queue_capacity")]
    pub delivery_queue_capacity: usize,
    /// Longest wait for room in a full queue before deliveries are dropped.
    #[serde(default = "default_delivery_enqueue_timeout_ms")]
    pub delivery_enqueue_timeout_ms: u64,
    /// Attempt-write tries before an attempt is logged and dropped.
    #[serde(default = "default_record_max_writes")]
    pub record_max_writes: u32,
    #[serde(default = "default_record_backoff_ms")]
    pub record_backoff_ms: u64,
    /// How long shutdown waits for in-flight deliveries.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Config for WebhooksConfig {}

fn default_port() -> u16 {
    3114
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_retry_jitter() -> f64 {
    0.1
}

fn default_delivery_workers() -> usize {
    16
}

fn default_delivery_queue_capacity() -> usize {
    1024
}

fn default_delivery_enqueue_timeout_ms() -> u64 {
    500
}

fn default_record_max_writes() -> u32 {
    3
}

fn default_record_backoff_ms() -> u64 {
    100
}

fn default_shutdown_grace_ms() -> u64 {
    10_000
}

impl WebhooksConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_enqueue_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            jitter_factor: self.retry_jitter.clamp(0.0, 1.0),
        }
    }

    pub fn record_policy(&self) -> RecordPolicy {
        RecordPolicy {
            max_writes: self.record_max_writes.max(1),
            backoff: Duration::from_millis(self.record_backoff_ms),
        }
    }
}

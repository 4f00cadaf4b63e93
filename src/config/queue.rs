//! Batch queue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for queuing requests that the rate limiter refuses.
///
/// Queued requests are grouped into batches by operation key and retried with
/// exponential backoff when a batch fails.
///
/// # Example
///
/// ```toml
/// [queue]
/// enabled = true
/// max_size = 100
/// max_wait_seconds = 300
/// batch_size = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// When false, refused requests fail immediately with a capacity error.
    pub enabled: bool,

    /// Maximum queued requests per agent class.
    ///
    /// A value of 0 disables queuing (equivalent to enabled=false).
    pub max_size: u32,

    /// Maximum time a request may wait before it is rejected.
    pub max_wait_seconds: u64,

    /// Maximum requests executed together as one batch.
    pub batch_size: usize,

    /// Failed batch retries before every member is rejected.
    pub max_retries: u32,

    /// Backoff base; retry `n` waits `base_delay_ms * 2^n`.
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay.
    pub max_delay_ms: u64,

    /// Interval of the background drain loop.
    pub drain_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 100,
            max_wait_seconds: 300,
            batch_size: 10,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            drain_interval_ms: 1000,
        }
    }
}

impl QueueConfig {
    /// Check if queuing is effectively enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.max_size > 0
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_disables_queue() {
        let config = QueueConfig {
            max_size: 0,
            ..Default::default()
        };
        assert!(!config.is_enabled());
        assert!(QueueConfig::default().is_enabled());
    }

    #[test]
    fn parse_from_toml() {
        let config: QueueConfig = toml::from_str("batch_size = 4\nbase_delay_ms = 50").unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.base_delay_ms, 50);
        assert_eq!(config.max_retries, 3);
    }
}

//! Configuration for health monitoring.

use serde::{Deserialize, Serialize};

/// Longest accepted history retention (one year).
pub const MAX_RETENTION_HOURS: u64 = 24 * 366;

/// Thresholds and retention for the health monitor.
///
/// # Example
///
/// ```toml
/// [health]
/// window_size = 100
/// latency_threshold_ms = 3000.0
/// error_rate_threshold = 0.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Number of latency samples in the rolling window
    pub window_size: usize,
    /// Average response time above which a backend is degraded
    pub latency_threshold_ms: f64,
    /// Error rate (0.0 - 1.0) above which a backend is degraded
    pub error_rate_threshold: f64,
    /// Recorded outcomes required before a backend can be flagged
    pub min_samples: u64,
    /// How long outcome history is retained
    pub retention_hours: u64,
    /// Seconds between background pruning passes
    pub prune_interval_seconds: u64,
    /// Capacity of the status/alert broadcast channel
    pub event_capacity: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            latency_threshold_ms: 3000.0,
            error_rate_threshold: 0.2,
            min_samples: 1,
            retention_hours: 24,
            prune_interval_seconds: 300,
            event_capacity: 256,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.error_rate_threshold) {
            return Err("error_rate_threshold must be within 0.0-1.0".to_string());
        }
        if self.latency_threshold_ms <= 0.0 {
            return Err("latency_threshold_ms must be > 0".to_string());
        }
        if self.retention_hours == 0 || self.retention_hours > MAX_RETENTION_HOURS {
            return Err(format!(
                "retention_hours must be within 1-{}",
                MAX_RETENTION_HOURS
            ));
        }
        if self.prune_interval_seconds == 0 {
            return Err("prune_interval_seconds must be > 0".to_string());
        }
        Ok(())
    }

    /// Retention period, clamped so an unvalidated config cannot overflow.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours.min(MAX_RETENTION_HOURS) as i64)
    }
}

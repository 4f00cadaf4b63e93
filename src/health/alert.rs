//! Health alerts and the events published to subscribers.

use super::state::HealthStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Generic degradation (latency or error rate)
    Medium,
    /// Degradation caused by throttling
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

/// Raised when a backend transitions from healthy to degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    pub backend_id: String,
    pub severity: AlertSeverity,
    pub reason: String,
    pub status: HealthStatus,
    pub raised_at: DateTime<Utc>,
}

/// Event published on the health broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HealthEvent {
    /// Snapshot emitted after every recompute
    Status(HealthStatus),
    /// Healthy → degraded transition
    Alert(HealthAlert),
}

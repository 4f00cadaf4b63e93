//! Per-backend health state tracking.

use super::config::HealthConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Kind of failed outcome reported to the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Backend returned an explicit error
    Failure,
    /// Attempt exceeded its timeout
    Timeout,
    /// Backend reported throttling or quota exhaustion
    Throttled,
}

/// One recorded outcome kept in the retention history.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSample {
    pub timestamp: DateTime<Utc>,
    /// Latency for successful outcomes
    pub latency_ms: Option<f64>,
    /// Failure kind for failed outcomes
    pub error: Option<ErrorKind>,
}

/// Derived health of one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub backend_id: String,
    pub avg_response_time_ms: f64,
    pub error_rate: f64,
    pub throttling_events: u64,
    pub is_degraded: bool,
    /// Outcomes within the retention period
    pub sample_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// Mutable tracking state for a single backend.
///
/// `errors`, `successes` and `throttling_events` always count exactly the
/// samples in `history`, so pruning ages old outcomes out of the error rate.
#[derive(Debug, Clone)]
pub struct BackendHealthState {
    /// Rolling window of the most recent latencies
    pub latencies: VecDeque<f64>,
    /// Failed outcomes within the retention period
    pub errors: u64,
    /// Successful outcomes within the retention period
    pub successes: u64,
    /// Throttling failures within the retention period
    pub throttling_events: u64,
    /// Successful outcomes since tracking started
    pub tasks_completed: u64,
    /// Timestamped outcomes within the retention period
    pub history: VecDeque<HealthSample>,
    /// Degradation flag from the last recompute (for detecting transitions)
    pub last_degraded: bool,
    pub last_updated: DateTime<Utc>,
}

impl Default for BackendHealthState {
    fn default() -> Self {
        Self {
            latencies: VecDeque::new(),
            errors: 0,
            successes: 0,
            throttling_events: 0,
            tasks_completed: 0,
            history: VecDeque::new(),
            last_degraded: false,
            last_updated: Utc::now(),
        }
    }
}

impl BackendHealthState {
    /// Outcomes within the retention period.
    pub fn total(&self) -> u64 {
        self.errors + self.successes
    }

    /// Record a successful response time, evicting the oldest sample when the
    /// window is full.
    pub fn record_latency(&mut self, latency_ms: f64, window_size: usize, now: DateTime<Utc>) {
        if self.latencies.len() >= window_size.max(1) {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency_ms.max(0.0));
        self.successes += 1;
        self.tasks_completed += 1;
        self.history.push_back(HealthSample {
            timestamp: now,
            latency_ms: Some(latency_ms),
            error: None,
        });
        self.last_updated = now;
    }

    /// Record a failed outcome.
    pub fn record_error(&mut self, kind: ErrorKind, now: DateTime<Utc>) {
        self.errors += 1;
        if kind == ErrorKind::Throttled {
            self.throttling_events += 1;
        }
        self.history.push_back(HealthSample {
            timestamp: now,
            latency_ms: None,
            error: Some(kind),
        });
        self.last_updated = now;
    }

    /// Derive the health status from the current state.
    ///
    /// Pure: the same state and config always give the same status.
    pub fn compute(&self, backend_id: &str, config: &HealthConfig) -> HealthStatus {
        let avg_response_time_ms = if self.latencies.is_empty() {
            0.0
        } else {
            self.latencies.iter().sum::<f64>() / self.latencies.len() as f64
        };

        let total = self.total();
        let error_rate = if total == 0 {
            0.0
        } else {
            self.errors as f64 / total as f64
        };

        let is_degraded = total >= config.min_samples.max(1)
            && (avg_response_time_ms > config.latency_threshold_ms
                || error_rate > config.error_rate_threshold);

        HealthStatus {
            backend_id: backend_id.to_string(),
            avg_response_time_ms,
            error_rate,
            throttling_events: self.throttling_events,
            is_degraded,
            sample_count: total,
            last_updated: self.last_updated,
        }
    }

    /// Drop history entries older than `cutoff` and take them out of the
    /// counts. Returns how many were removed.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while self
            .history
            .front()
            .is_some_and(|sample| sample.timestamp < cutoff)
        {
            let Some(sample) = self.history.pop_front() else {
                break;
            };
            match sample.error {
                None => self.successes = self.successes.saturating_sub(1),
                Some(kind) => {
                    self.errors = self.errors.saturating_sub(1);
                    if kind == ErrorKind::Throttled {
                        self.throttling_events = self.throttling_events.saturating_sub(1);
                    }
                }
            }
            removed += 1;
        }
        removed
    }
}

//! Health monitoring module for agent backends.
//!
//! Tracks a rolling latency window and cumulative error counts per backend,
//! derives a `HealthStatus` on every recorded outcome, publishes snapshots to
//! subscribers and raises alerts when a backend becomes degraded.

mod alert;
mod config;
mod state;


pub use alert::*;
pub use config::*;
pub use state::*;

use crate::registry::{AgentPerformance, Registry};
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Recorded outcome fed into a recompute.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Latency(f64),
    Error(ErrorKind),
}

/// Rolling health tracker shared by every in-flight task.
pub struct HealthMonitor {
    /// Registry whose performance snapshots this monitor owns
    registry: Arc<Registry>,
    config: HealthConfig,
    /// Per-backend tracking state; each entry lock is the critical section
    state: DashMap<String, BackendHealthState>,
    events: broadcast::Sender<HealthEvent>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<Registry>,
        config: HealthConfig,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            registry,
            config,
            state: DashMap::new(),
            events,
            telemetry,
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Subscribe to status snapshots and alerts.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.events.subscribe()
    }

    /// Record a successful response and recompute the backend's health.
    pub fn record_response_time(&self, backend_id: &str, latency_ms: f64) -> HealthStatus {
        self.record(backend_id, Outcome::Latency(latency_ms))
    }

    /// Record a failed outcome and recompute the backend's health.
    pub fn record_error(&self, backend_id: &str, kind: ErrorKind) -> HealthStatus {
        self.record(backend_id, Outcome::Error(kind))
    }

    fn record(&self, backend_id: &str, outcome: Outcome) -> HealthStatus {
        let now = Utc::now();
        let cutoff = now - self.config.retention();

        let (status, was_degraded, tasks_completed) = {
            let mut state = self.state.entry(backend_id.to_string()).or_default();
            match outcome {
                Outcome::Latency(latency_ms) => {
                    state.record_latency(latency_ms, self.config.window_size, now)
                }
                Outcome::Error(kind) => state.record_error(kind, now),
            }
            state.prune(cutoff);

            let status = state.compute(backend_id, &self.config);
            let was_degraded = state.last_degraded;
            state.last_degraded = status.is_degraded;
            (status, was_degraded, state.tasks_completed)
        };

        let throttled = matches!(outcome, Outcome::Error(ErrorKind::Throttled));
        self.publish(status.clone(), was_degraded, tasks_completed, throttled);
        status
    }

    /// Push a recomputed status to the registry and subscribers, alerting on
    /// a healthy to degraded transition.
    fn publish(&self, status: HealthStatus, was_degraded: bool, tasks_completed: u64, throttled: bool) {
        let backend_id = status.backend_id.as_str();
        // Unregistered backends are still tracked, only the snapshot is skipped
        let _ = self.registry.update_performance(
            backend_id,
            AgentPerformance {
                avg_response_time_ms: status.avg_response_time_ms,
                error_rate: status.error_rate,
                tasks_completed,
            },
        );

        // Ignore error if no receivers are listening
        let _ = self.events.send(HealthEvent::Status(status.clone()));

        if status.is_degraded && !was_degraded {
            self.raise_alert(&status, throttled);
        } else if was_degraded && !status.is_degraded {
            tracing::info!(
                agent_id = %backend_id,
                avg_response_time_ms = status.avg_response_time_ms,
                error_rate = status.error_rate,
                "Agent recovered"
            );
        }
    }

    fn raise_alert(&self, status: &HealthStatus, throttled: bool) {
        let severity = if throttled {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };

        let reason = if throttled {
            format!(
                "throttled by backend ({} throttling events)",
                status.throttling_events
            )
        } else if status.avg_response_time_ms > self.config.latency_threshold_ms {
            format!(
                "average response time {:.0}ms exceeds {:.0}ms",
                status.avg_response_time_ms, self.config.latency_threshold_ms
            )
        } else {
            format!(
                "error rate {:.2} exceeds {:.2}",
                status.error_rate, self.config.error_rate_threshold
            )
        };

        let alert = HealthAlert {
            backend_id: status.backend_id.clone(),
            severity,
            reason,
            status: status.clone(),
            raised_at: Utc::now(),
        };

        let _ = self.events.send(HealthEvent::Alert(alert.clone()));
        self.telemetry.record(TelemetryEvent::HealthAlert(alert));
    }

    /// Current status of one backend, if anything was recorded for it.
    pub fn get(&self, backend_id: &str) -> Option<HealthStatus> {
        self.state
            .get(backend_id)
            .map(|state| state.compute(backend_id, &self.config))
    }

    /// Current status of every tracked backend.
    pub fn all(&self) -> HashMap<String, HealthStatus> {
        self.state
            .iter()
            .map(|entry| {
                let id = entry.key().clone();
                let status = entry.value().compute(&id, &self.config);
                (id, status)
            })
            .collect()
    }

    /// True if the backend is currently degraded. Untracked backends are not.
    pub fn is_degraded(&self, backend_id: &str) -> bool {
        self.get(backend_id).is_some_and(|status| status.is_degraded)
    }

    /// Remove history older than the retention period from every backend.
    ///
    /// Backends that lost samples are recomputed and republished, so aged-out
    /// failures can clear a degraded flag.
    pub fn prune(&self) -> usize {
        let cutoff = Utc::now() - self.config.retention();
        let mut removed = 0;
        let mut changed = Vec::new();
        for mut entry in self.state.iter_mut() {
            let pruned = entry.value_mut().prune(cutoff);
            if pruned == 0 {
                continue;
            }
            removed += pruned;
            let status = entry.value().compute(entry.key(), &self.config);
            let was_degraded = entry.last_degraded;
            entry.last_degraded = status.is_degraded;
            changed.push((status, was_degraded, entry.tasks_completed));
        }

        // Entry locks are released before the registry and channels are touched
        for (status, was_degraded, tasks_completed) in changed {
            self.publish(status, was_degraded, tasks_completed, false);
        }
        removed
    }

    /// Start the background pruning task.
    /// Returns a JoinHandle that resolves when the task stops.
    pub fn start(self: Arc<Self>, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(
                self.config.prune_interval_seconds.max(1),
            ));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                prune_interval_seconds = self.config.prune_interval_seconds,
                retention_hours = self.config.retention_hours,
                "Health monitor started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Health monitor shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let pruned = self.prune();
                        tracing::debug!(pruned, "Health history pruned");
                    }
                }
            }
        })
    }
}

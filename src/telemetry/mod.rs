//! Telemetry sink for routing decisions, alerts, cost records and outcomes.
//!
//! The control plane reports what it decided through `TelemetrySink::record`
//! and never waits on the consumer. Dashboards and metrics endpoints live
//! outside this crate.
//!
//! ## Metrics Tracked (`TracingSink`)
//!
//! **Counters:**
//! - `switchyard_routing_decisions_total{mode, agent}`
//! - `switchyard_attempts_total{agent, outcome}`
//! - `switchyard_health_alerts_total{agent, severity}`
//! - `switchyard_verification_discrepancies_total`
//! - `switchyard_mode_switches_total{to}`
//! - `switchyard_tasks_total{mode, status}`
//!
//! **Histograms:**
//! - `switchyard_task_duration_seconds{mode}`
//! - `switchyard_cost_usd{agent}`

use crate::cost::CostRecord;
use crate::health::HealthAlert;
use crate::mode::OperationalMode;
use crate::orchestrator::{ExecutionResult, VerificationResult};
use crate::routing::RoutingDecision;
use serde::Serialize;
use tokio::sync::broadcast;

/// One observable event emitted by the control plane.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    RoutingDecision {
        task_id: String,
        mode: OperationalMode,
        decision: RoutingDecision,
    },
    Attempt {
        task_id: String,
        result: ExecutionResult,
    },
    HealthAlert(HealthAlert),
    CostRecorded(CostRecord),
    VerificationDiscrepancy(VerificationResult),
    ModeSwitched {
        from: OperationalMode,
        to: OperationalMode,
    },
    TaskCompleted {
        task_id: String,
        mode: OperationalMode,
        success: bool,
        attempts: usize,
        latency_ms: u64,
    },
}

impl TelemetryEvent {
    /// Short event name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryEvent::RoutingDecision { .. } => "routing_decision",
            TelemetryEvent::Attempt { .. } => "attempt",
            TelemetryEvent::HealthAlert(_) => "health_alert",
            TelemetryEvent::CostRecorded(_) => "cost_recorded",
            TelemetryEvent::VerificationDiscrepancy(_) => "verification_discrepancy",
            TelemetryEvent::ModeSwitched { .. } => "mode_switched",
            TelemetryEvent::TaskCompleted { .. } => "task_completed",
        }
    }
}

/// Fire-and-forget consumer of telemetry events.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record(&self, event: TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Writes events to `tracing` and updates `metrics` counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::RoutingDecision {
                task_id,
                mode,
                decision,
            } => {
                metrics::counter!("switchyard_routing_decisions_total",
                    "mode" => mode.as_str(),
                    "agent" => decision.chosen_agent_id.clone()
                )
                .increment(1);
                tracing::debug!(
                    task_id = %task_id,
                    mode = %mode,
                    agent_id = %decision.chosen_agent_id,
                    predicted_cost = decision.predicted_cost,
                    confidence = decision.confidence,
                    reason = %decision.reason,
                    "Routing decision"
                );
            }
            TelemetryEvent::Attempt { task_id, result } => {
                metrics::counter!("switchyard_attempts_total",
                    "agent" => result.agent_id.clone(),
                    "outcome" => result.outcome.label()
                )
                .increment(1);
                tracing::debug!(
                    task_id = %task_id,
                    agent_id = %result.agent_id,
                    outcome = result.outcome.label(),
                    latency_ms = result.latency_ms,
                    "Attempt recorded"
                );
            }
            TelemetryEvent::HealthAlert(alert) => {
                metrics::counter!("switchyard_health_alerts_total",
                    "agent" => alert.backend_id.clone(),
                    "severity" => alert.severity.as_str()
                )
                .increment(1);
                tracing::warn!(
                    agent_id = %alert.backend_id,
                    severity = alert.severity.as_str(),
                    reason = %alert.reason,
                    "Health alert"
                );
            }
            TelemetryEvent::CostRecorded(record) => {
                metrics::histogram!("switchyard_cost_usd", "agent" => record.backend.clone())
                    .record(record.cost_estimate);
            }
            TelemetryEvent::VerificationDiscrepancy(result) => {
                metrics::counter!("switchyard_verification_discrepancies_total").increment(1);
                tracing::warn!(
                    task_id = %result.task_id,
                    verifier_id = %result.verifier_id,
                    confidence = result.confidence,
                    notes = %result.notes,
                    "Verification discrepancy"
                );
            }
            TelemetryEvent::ModeSwitched { from, to } => {
                metrics::counter!("switchyard_mode_switches_total", "to" => to.as_str())
                    .increment(1);
                tracing::debug!(from = %from, to = %to, "Mode switch recorded");
            }
            TelemetryEvent::TaskCompleted {
                task_id,
                mode,
                success,
                attempts,
                latency_ms,
            } => {
                let status = if *success { "success" } else { "exhausted" };
                metrics::counter!("switchyard_tasks_total",
                    "mode" => mode.as_str(),
                    "status" => status
                )
                .increment(1);
                metrics::histogram!("switchyard_task_duration_seconds", "mode" => mode.as_str())
                    .record(*latency_ms as f64 / 1000.0);
                tracing::info!(
                    task_id = %task_id,
                    mode = %mode,
                    status,
                    attempts,
                    latency_ms,
                    "Task completed"
                );
            }
        }
    }
}

/// Publishes events on a broadcast channel for live consumers.
///
/// Sending never blocks; events are dropped when nobody is subscribed and
/// slow receivers observe `Lagged`.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }
}

impl TelemetrySink for BroadcastSink {
    fn record(&self, event: TelemetryEvent) {
        // Ignore error if no receivers are listening
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();

        sink.record(TelemetryEvent::ModeSwitched {
            from: OperationalMode::FullRedundancy,
            to: OperationalMode::CliOnly,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "mode_switched");
    }

    #[test]
    fn broadcast_sink_without_subscribers_does_not_panic() {
        let sink = BroadcastSink::new(1);
        sink.record(TelemetryEvent::ModeSwitched {
            from: OperationalMode::CliOnly,
            to: OperationalMode::HostedOnly,
        });
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = TelemetryEvent::ModeSwitched {
            from: OperationalMode::SupervisorOnly,
            to: OperationalMode::FullRedundancy,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "mode_switched");
        assert_eq!(json["from"], "supervisor-only");
        assert_eq!(json["to"], "full-redundancy");
    }
}

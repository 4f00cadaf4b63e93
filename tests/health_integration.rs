//! Integration tests for health monitoring
//!
//! Health is fed by dispatch outcomes and read back by routing, so these
//! tests go through the control plane wherever they can.

mod common;

use common::*;
use std::time::Duration;
use switchyard::health::{AlertSeverity, ErrorKind, HealthEvent};
use switchyard::registry::AgentClass;
use switchyard::task::Task;

#[tokio::test]
async fn slow_agent_is_degraded_and_routed_around() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let mut config = config_with(standard_agents());
    config.orchestrator.verification.enabled = false;
    let plane = plane(config, &executor, &telemetry);

    // 4000ms average against the 3000ms threshold
    let status = plane.health().record_response_time("codex", 4000.0);
    assert!(status.is_degraded);
    assert!(plane.health().is_degraded("codex"));

    let outcome = plane
        .submit_task(Task::new("review", "diff").with_capabilities(["review"]), None)
        .await
        .unwrap();

    assert_eq!(outcome.decision.chosen_agent_id, "gemini");
    // Degraded agents stay reachable at the end of the chain
    assert_eq!(outcome.decision.alternatives.last().map(String::as_str), Some("codex"));
}

#[tokio::test]
async fn degradation_raises_one_alert_and_recovery_clears_it() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);
    let mut events = plane.subscribe_health();

    plane.health().record_response_time("gemini", 100.0);
    plane.health().record_error("gemini", ErrorKind::Failure);
    plane.health().record_error("gemini", ErrorKind::Failure);

    let mut statuses = 0;
    let mut alerts = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            HealthEvent::Status(_) => statuses += 1,
            HealthEvent::Alert(alert) => alerts.push(alert),
        }
    }
    assert_eq!(statuses, 3);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].backend_id, "gemini");
    assert_eq!(alerts[0].severity, AlertSeverity::Medium);
    assert!(alerts[0].reason.contains("error rate"));
    assert_eq!(telemetry.count("health_alert"), 1);

    // Enough successes bring the error rate back under 0.2
    for _ in 0..10 {
        plane.health().record_response_time("gemini", 100.0);
    }
    assert!(!plane.health().is_degraded("gemini"));
}

#[tokio::test]
async fn backend_throttling_raises_a_high_severity_alert() {
    let executor = ScriptedExecutor::new();
    executor.then("codex", [Step::Throttle]);
    let telemetry = RecordingSink::new();
    let mut config = config_with(standard_agents());
    config.orchestrator.verification.enabled = false;
    let plane = plane(config, &executor, &telemetry);
    let mut events = plane.subscribe_health();

    plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    let alert = std::iter::from_fn(|| events.try_recv().ok())
        .find_map(|event| match event {
            HealthEvent::Alert(alert) => Some(alert),
            HealthEvent::Status(_) => None,
        })
        .expect("alert published");
    assert_eq!(alert.backend_id, "codex");
    assert_eq!(alert.severity, AlertSeverity::High);
    assert_eq!(alert.status.throttling_events, 1);
}

#[tokio::test]
async fn dispatch_outcomes_feed_health_and_registry() {
    let executor = ScriptedExecutor::new();
    executor.then("codex", [fail("boom")]);
    let telemetry = RecordingSink::new();
    let mut config = config_with(standard_agents());
    config.orchestrator.verification.enabled = false;
    let plane = plane(config, &executor, &telemetry);

    plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    let all = plane.get_health(None);
    let ids: Vec<_> = all.iter().map(|s| s.backend_id.as_str()).collect();
    assert_eq!(ids, vec!["codex", "gemini"]);

    let codex = &plane.get_health(Some("codex"))[0];
    assert_eq!(codex.error_rate, 1.0);
    assert!(codex.is_degraded);
    let registered = plane.registry().get("codex").unwrap();
    assert_eq!(registered.performance.error_rate, 1.0);

    assert!(plane.get_health(Some("claude-api")).is_empty());
}

#[tokio::test]
async fn health_stays_within_the_latency_window() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let mut config = config_with(vec![agent_config("codex", AgentClass::Cli, &[])]);
    config.health.window_size = 3;
    let plane = plane(config, &executor, &telemetry);

    for latency in [9000.0, 9000.0, 9000.0, 100.0, 100.0, 100.0] {
        plane.health().record_response_time("codex", latency);
    }

    let status = &plane.get_health(Some("codex"))[0];
    assert_eq!(status.avg_response_time_ms, 100.0);
    assert_eq!(status.sample_count, 6);
    assert!(!status.is_degraded);
}

#[tokio::test(start_paused = true)]
async fn pruning_loop_runs_until_cancelled() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);
    plane.health().record_response_time("codex", 50.0);

    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = plane.health().clone().start(cancel.clone());
    tokio::time::sleep(Duration::from_secs(900)).await;

    // Fresh samples survive pruning
    assert_eq!(plane.get_health(Some("codex"))[0].sample_count, 1);

    cancel.cancel();
    handle.await.unwrap();
}

//! Integration tests for operational modes
//!
//! The active mode restricts which classes routing may use; switching is
//! atomic and observable through the watch channel and telemetry.

mod common;

use common::*;
use switchyard::config::ModeOverride;
use switchyard::mode::{ModeError, OperationalMode};
use switchyard::registry::AgentClass;
use switchyard::routing::RoutingStrategy;
use switchyard::task::Task;

#[tokio::test]
async fn switching_to_hosted_only_moves_routing_off_cli() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);

    let outcome = plane.switch_mode("hosted-only").unwrap();
    assert_eq!(outcome.previous, OperationalMode::FullRedundancy);
    assert!(outcome.changed());

    let result = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();
    assert_eq!(result.mode, OperationalMode::HostedOnly);
    assert_eq!(result.result.agent_id, "claude-api");
    assert_eq!(result.decision.strategy, RoutingStrategy::CostOptimized);
    assert!(result.decision.alternatives.is_empty());
}

#[tokio::test]
async fn cli_only_round_robins_across_cli_agents() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let mut config = config_with(standard_agents());
    config.modes.default = OperationalMode::CliOnly;
    let plane = plane(config, &executor, &telemetry);

    for i in 0..4 {
        plane
            .submit_task(Task::new("review", format!("diff {}", i)), None)
            .await
            .unwrap();
    }

    assert_eq!(executor.calls(), vec!["codex", "gemini", "codex", "gemini"]);
}

#[tokio::test]
async fn unknown_mode_is_rejected_and_nothing_changes() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);

    let err = plane.switch_mode("turbo").unwrap_err();
    let ModeError::InvalidMode { name, valid } = err;
    assert_eq!(name, "turbo");
    assert_eq!(valid.len(), 4);
    assert_eq!(plane.current_mode(), OperationalMode::FullRedundancy);
    assert_eq!(telemetry.count("mode_switched"), 0);
}

#[tokio::test]
async fn subscribers_see_the_latest_mode() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);
    let mut watcher = plane.subscribe_modes();

    plane.switch_mode("cli-only").unwrap();
    plane.switch_mode("supervisor-only").unwrap();

    watcher.changed().await.unwrap();
    assert_eq!(*watcher.borrow_and_update(), OperationalMode::SupervisorOnly);
    assert_eq!(telemetry.count("mode_switched"), 2);

    // Re-selecting the active mode is a no-op
    let same = plane.switch_mode("supervisor-only").unwrap();
    assert!(!same.changed());
    assert_eq!(telemetry.count("mode_switched"), 2);
}

#[tokio::test]
async fn per_task_mode_does_not_switch_and_is_counted_separately() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);

    let outcome = plane
        .submit_task(
            Task::new("plan", "roadmap"),
            Some(OperationalMode::SupervisorOnly),
        )
        .await
        .unwrap();
    assert_eq!(outcome.result.agent_id, "supervisor");
    assert_eq!(plane.current_mode(), OperationalMode::FullRedundancy);

    plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    let stats = plane.mode_stats();
    assert_eq!(stats[&OperationalMode::SupervisorOnly].tasks, 1);
    assert_eq!(stats[&OperationalMode::FullRedundancy].tasks, 1);
    assert_eq!(stats[&OperationalMode::FullRedundancy].success_rate(), 1.0);
}

#[tokio::test]
async fn failed_tasks_count_as_mode_errors() {
    let executor = ScriptedExecutor::new();
    executor.always("supervisor", fail("offline"));
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);
    plane.switch_mode("supervisor-only").unwrap();

    assert!(plane
        .submit_task(Task::new("plan", "x"), None)
        .await
        .is_err());

    let stats = plane.mode_stats();
    assert_eq!(stats[&OperationalMode::SupervisorOnly].errors, 1);
    assert_eq!(telemetry.count("task_completed"), 1);
}

#[tokio::test]
async fn configured_overrides_change_mode_behavior() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let mut config = config_with(standard_agents());
    config.modes.overrides.insert(
        "cli-only".to_string(),
        ModeOverride {
            allowed_classes: Some(vec![AgentClass::Cli, AgentClass::Supervisory]),
            routing_strategy: Some(RoutingStrategy::CapabilityMatch),
            cross_verification: None,
        },
    );
    let plane = plane(config, &executor, &telemetry);

    let cli_only = plane
        .get_available_modes()
        .into_iter()
        .find(|info| info.mode == OperationalMode::CliOnly)
        .unwrap();
    assert_eq!(cli_only.config.routing_strategy, RoutingStrategy::CapabilityMatch);
    assert!(cli_only.config.allows(AgentClass::Supervisory));
    assert!(!cli_only.active);

    let route = plane
        .route(
            &Task::new("plan", "roadmap").with_capabilities(["plan"]),
            Some(OperationalMode::CliOnly),
        )
        .unwrap();
    assert_eq!(route.decision.chosen_agent_id, "supervisor");
}

#[tokio::test]
async fn concurrent_switches_leave_one_consistent_mode() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = std::sync::Arc::new(plane(config_with(standard_agents()), &executor, &telemetry));

    let handles: Vec<_> = ["cli-only", "hosted-only", "supervisor-only", "full-redundancy"]
        .into_iter()
        .cycle()
        .take(40)
        .map(|name| {
            let plane = plane.clone();
            tokio::spawn(async move { plane.switch_mode(name).unwrap() })
        })
        .collect();
    let outcomes: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let last = plane.current_mode();
    assert!(outcomes.iter().any(|o| o.current == last));
    assert_eq!(
        telemetry.count("mode_switched"),
        outcomes.iter().filter(|o| o.changed()).count()
    );
}

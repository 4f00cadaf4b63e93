//! Integration tests for cross-verification
//!
//! Verification re-runs an accepted task on a backend of another class and
//! reports disagreement without touching the accepted result.

mod common;

use common::*;
use switchyard::config::SwitchyardConfig;
use switchyard::telemetry::TelemetryEvent;
use switchyard::task::Task;

/// Full redundancy, verifying every task that has a hosted agent in reach.
fn verifying_config() -> SwitchyardConfig {
    let mut config = config_with(standard_agents());
    config.orchestrator.verification.require_mixed_attempts = false;
    config
}

#[tokio::test]
async fn discrepancy_is_reported_and_result_kept() {
    let executor = ScriptedExecutor::new();
    executor.always("codex", reply("use a mutex here"));
    executor.always("claude-api", reply("use a channel here"));
    let telemetry = RecordingSink::new();
    let plane = plane(verifying_config(), &executor, &telemetry);

    let outcome = plane
        .submit_task(Task::new("review", "shared counter"), None)
        .await
        .unwrap();

    assert_eq!(outcome.result.agent_id, "codex");
    assert_eq!(outcome.result.outcome.output(), Some("use a mutex here"));
    // The verification call is not an attempt
    assert_eq!(outcome.attempts.len(), 1);

    let verification = outcome.verification.expect("verified");
    assert_eq!(verification.primary_id, "codex");
    assert_eq!(verification.verifier_id, "claude-api");
    assert!(!verification.agreement);
    assert!((verification.confidence - 0.6).abs() < 1e-9);

    let discrepancies: Vec<_> = telemetry
        .events()
        .into_iter()
        .filter_map(|event| match event {
            TelemetryEvent::VerificationDiscrepancy(result) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(discrepancies[0].task_id, outcome.task_id);
    assert_eq!(executor.calls(), vec!["codex", "claude-api"]);
}

#[tokio::test]
async fn outputs_differing_only_in_case_and_spacing_agree() {
    let executor = ScriptedExecutor::new();
    executor.always("codex", reply("LGTM,  ship it"));
    executor.always("claude-api", reply("lgtm, ship it\n"));
    let telemetry = RecordingSink::new();
    let plane = plane(verifying_config(), &executor, &telemetry);

    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    let verification = outcome.verification.unwrap();
    assert!(verification.agreement);
    assert_eq!(verification.confidence, 1.0);
    assert_eq!(telemetry.count("verification_discrepancy"), 0);
}

#[tokio::test]
async fn single_class_attempts_are_not_verified_by_default() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);

    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    assert!(outcome.verification.is_none());
    assert_eq!(executor.calls(), vec!["codex"]);
}

#[tokio::test]
async fn mixed_attempts_are_verified_by_another_class() {
    let executor = ScriptedExecutor::new();
    executor.then("codex", [fail("crash")]);
    executor.then("gemini", [fail("crash")]);
    executor.always("claude-api", reply("refactor the loop"));
    executor.always("supervisor", reply("refactor the loop"));
    let telemetry = RecordingSink::new();
    let plane = plane(config_with(standard_agents()), &executor, &telemetry);

    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    assert_eq!(outcome.result.agent_id, "claude-api");
    let verification = outcome.verification.unwrap();
    // Both cli agents were tried, so the supervisor verifies
    assert_eq!(verification.verifier_id, "supervisor");
    assert!(verification.agreement);
}

#[tokio::test]
async fn no_available_verifier_skips_verification() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let mut config = config_with(vec![
        agent_config("codex", switchyard::registry::AgentClass::Cli, &[]),
        agent_config("claude-api", switchyard::registry::AgentClass::Hosted, &[]),
    ]);
    config.orchestrator.verification.require_mixed_attempts = false;
    config.rate_limits.hosted = strict_limit(1, 3600);
    let plane = plane(config, &executor, &telemetry);
    plane
        .rate_limiter()
        .try_acquire(switchyard::registry::AgentClass::Hosted)
        .unwrap();

    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    assert!(outcome.verification.is_none());
    assert_eq!(executor.calls(), vec!["codex"]);
}

#[tokio::test]
async fn failed_verifier_leaves_outcome_unverified() {
    let executor = ScriptedExecutor::new();
    executor.always("claude-api", fail("500"));
    let telemetry = RecordingSink::new();
    let plane = plane(verifying_config(), &executor, &telemetry);

    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();

    assert_eq!(outcome.result.agent_id, "codex");
    assert!(outcome.verification.is_none());
    // The failed verification still counts against the verifier's health
    assert!(plane.health().is_degraded("claude-api"));
}

#[tokio::test]
async fn disabled_verification_and_non_verifying_modes_skip_it() {
    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let mut config = verifying_config();
    config.orchestrator.verification.enabled = false;
    let plane = plane(config, &executor, &telemetry);

    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();
    assert!(outcome.verification.is_none());

    let executor = ScriptedExecutor::new();
    let telemetry = RecordingSink::new();
    let plane = common::plane(verifying_config(), &executor, &telemetry);
    plane.switch_mode("cli-only").unwrap();
    let outcome = plane
        .submit_task(Task::new("review", "diff"), None)
        .await
        .unwrap();
    assert!(outcome.verification.is_none());
    assert_eq!(executor.calls().len(), 1);
}

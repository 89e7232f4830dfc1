//! Test: Wall-clock budgets and cancellation

use crate::helpers::*;
use matrix_ci::core::{ConfigurationStatus, PipelineStatus, RunStatus, TriggerEvent, TriggerKind};
use matrix_ci::execution::PipelineEngine;

const BUDGETED_YAML: &str = r#"
name: "budgeted"
default_branch: "master"
configurations:
  - name: "fast"
    manual_target: true
  - name: "slow"
    budget_secs: 1
steps:
  - name: "install"
    run: "./install.sh"
  - name: "test"
    run: "./run_tests.sh"
"#;

/// A configuration that exceeds its budget is forced to Failed
#[tokio::test(start_paused = true)]
async fn test_budget_exceeded_fails_the_configuration() {
    let action = MockAction::passing().hang_step_in("slow", "test");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_yaml(BUDGETED_YAML, action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_configuration_status(&result, "slow", ConfigurationStatus::Failed);
    assert_configuration_status(&result, "fast", ConfigurationStatus::Success);

    let slow = result.configuration("slow").unwrap();
    let error = slow.error.as_deref().unwrap();
    assert!(error.contains("budget"), "unexpected error: {}", error);
}

/// Steps completed before the budget elapsed stay in the history
#[tokio::test(start_paused = true)]
async fn test_budget_keeps_partial_history() {
    let action = MockAction::passing().hang_step_in("slow", "test");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_yaml(BUDGETED_YAML, action, &event).await;

    assert_step_ok(&result, "slow", "install");
    // The in-flight step was abandoned and never recorded
    let history = &result.configuration("slow").unwrap().history;
    assert!(history.outcome_of("test").is_none());
}

/// Cancellation forces Failed, never Skipped
#[tokio::test]
async fn test_cancellation_fails_configurations() {
    let matrix = matrix_from_yaml(FIVE_CONFIG_YAML);
    let engine = PipelineEngine::new(MockAction::passing());
    engine.cancel();

    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = engine.run(&matrix, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_eq!(result.state.status, RunStatus::Cancelled);
    for configuration in &result.configurations {
        assert_eq!(
            configuration.status,
            ConfigurationStatus::Failed,
            "cancelled configuration {} must fail, not skip",
            configuration.name
        );
        let error = configuration.error.as_deref().unwrap();
        assert!(error.contains("cancelled"), "unexpected error: {}", error);
    }
}

/// Cancellation of a manual dispatch leaves gate skips as skips
#[tokio::test]
async fn test_cancellation_does_not_rewrite_gate_skips() {
    let matrix = matrix_from_yaml(FIVE_CONFIG_YAML);
    let engine = PipelineEngine::new(MockAction::passing());
    engine.cancel();

    let event = TriggerEvent::new(TriggerKind::Manual, "master", "dev");
    let result = engine.run(&matrix, &event).await;

    // Gate rejection happened before cancellation was consulted
    assert_configuration_status(&result, "baseline", ConfigurationStatus::Skipped);
    assert_configuration_status(&result, "latest", ConfigurationStatus::Failed);
}

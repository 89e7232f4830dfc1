//! Test: Trigger gating - which configurations run for which events

use crate::helpers::*;
use matrix_ci::core::{ConfigurationStatus, PipelineStatus, TriggerEvent, TriggerKind};

/// A push runs every configuration in the matrix
#[tokio::test]
async fn test_push_runs_all_configurations() {
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(MockAction::passing(), &event).await;

    assert_pipeline_status(&result, PipelineStatus::Success);
    for name in ["baseline", "no_pyoptsparse", "no_snopt", "latest", "oldest"] {
        assert_configuration_status(&result, name, ConfigurationStatus::Success);
    }
}

/// A manual dispatch runs only the designated target configuration
#[tokio::test]
async fn test_manual_runs_only_the_target() {
    let event = TriggerEvent::new(TriggerKind::Manual, "master", "dev");
    let result = run_fixture(MockAction::passing(), &event).await;

    assert_pipeline_status(&result, PipelineStatus::Success);
    assert_configuration_status(&result, "latest", ConfigurationStatus::Success);
    for name in ["baseline", "no_pyoptsparse", "no_snopt", "oldest"] {
        assert_configuration_status(&result, name, ConfigurationStatus::Skipped);
    }
}

/// Gated-out configurations never invoke the action
#[tokio::test]
async fn test_gated_out_configurations_never_run_steps() {
    let action = MockAction::passing();
    let calls = action.call_log();
    let event = TriggerEvent::new(TriggerKind::Manual, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert!(result.configuration("baseline").unwrap().history.is_empty());
    let calls = calls.lock().unwrap();
    assert!(calls.iter().all(|(configuration, _)| configuration == "latest"));
}

/// Scheduled and pull-request triggers behave like push for gating
#[tokio::test]
async fn test_scheduled_and_pull_request_run_everything() {
    for kind in [TriggerKind::Scheduled, TriggerKind::PullRequest] {
        let event = TriggerEvent::new(kind, "feature/x", "ci");
        let result = run_fixture(MockAction::passing(), &event).await;

        assert_pipeline_status(&result, PipelineStatus::Success);
        assert_eq!(result.state.succeeded, 5);
        assert_eq!(result.state.skipped, 0);
    }
}

/// A failing manual target fails the pipeline even with the rest gated out
#[tokio::test]
async fn test_manual_target_failure_fails_the_pipeline() {
    let action = MockAction::passing().fail_step_in("latest", "test");
    let event = TriggerEvent::new(TriggerKind::Manual, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_configuration_status(&result, "latest", ConfigurationStatus::Failed);
}

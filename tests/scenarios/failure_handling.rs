//! Test: Failure handling - fast-skip, diagnostics steps, isolation

use crate::helpers::*;
use matrix_ci::core::{ConfigurationStatus, PipelineStatus, TriggerEvent, TriggerKind};

/// A mandatory step failure fast-skips everything after it
#[tokio::test]
async fn test_hard_failure_fast_skips_later_steps() {
    let action = MockAction::passing().fail_step_in("no_snopt", "install");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_configuration_status(&result, "no_snopt", ConfigurationStatus::Failed);
    assert_step_failed(&result, "no_snopt", "install");
    assert_step_skipped(&result, "no_snopt", "test", Some("prior mandatory step failed"));
    assert_step_skipped(&result, "no_snopt", "docs", Some("prior mandatory step failed"));
}

/// A diagnostics step whose predicate observes the failure still runs
#[tokio::test]
async fn test_diagnostics_step_survives_fast_skip() {
    let action = MockAction::passing().fail_step_in("no_snopt", "test");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_step_failed(&result, "no_snopt", "test");
    assert_step_ok(&result, "no_snopt", "show_logs");
}

/// Without any failure the diagnostics step's predicate is unsatisfied
#[tokio::test]
async fn test_diagnostics_step_skipped_on_success() {
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(MockAction::passing(), &event).await;

    assert_step_skipped(&result, "baseline", "show_logs", Some("predicate unsatisfied"));
}

/// One configuration's failure never touches its siblings
#[tokio::test]
async fn test_failure_is_isolated_per_configuration() {
    let action = MockAction::passing().fail_step_in("oldest", "install");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_configuration_status(&result, "oldest", ConfigurationStatus::Failed);
    for name in ["baseline", "no_pyoptsparse", "no_snopt", "latest"] {
        assert_configuration_status(&result, name, ConfigurationStatus::Success);
    }
}

/// A matrix-wide step failure fails every configuration
#[tokio::test]
async fn test_matrix_wide_failure() {
    let action = MockAction::passing().fail_step("test");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_eq!(result.state.failed, 5);

    // Diagnostics ran everywhere
    for name in ["baseline", "no_pyoptsparse", "no_snopt", "latest", "oldest"] {
        assert_step_ok(&result, name, "show_logs");
    }
}

/// A worker that dies without reporting is accounted as Failed
#[tokio::test]
async fn test_panicked_worker_accounts_as_failed() {
    let action = MockAction::passing().panic_step_in("no_snopt", "install");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_configuration_status(&result, "no_snopt", ConfigurationStatus::Failed);
    let no_snopt = result.configuration("no_snopt").unwrap();
    let error = no_snopt.error.as_deref().unwrap();
    assert!(error.contains("never reported"), "unexpected error: {}", error);

    // Siblings finish normally
    for name in ["baseline", "no_pyoptsparse", "latest", "oldest"] {
        assert_configuration_status(&result, name, ConfigurationStatus::Success);
    }
}

/// Skipped steps are recorded, not omitted, so the history stays complete
#[tokio::test]
async fn test_history_records_every_step() {
    let action = MockAction::passing().fail_step_in("baseline", "install");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    let history = &result.configuration("baseline").unwrap().history;
    assert_eq!(history.len(), 5);
}

//! Test: Tolerated failures - continue_on_error steps

use crate::helpers::*;
use matrix_ci::core::{ConfigurationStatus, PipelineStatus, TriggerEvent, TriggerKind};

/// A tolerated step failure does not fail the configuration
#[tokio::test]
async fn test_tolerated_failure_keeps_configuration_green() {
    let action = MockAction::passing().fail_step_in("baseline", "coveralls");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_fixture(action, &event).await;

    assert_step_failed(&result, "baseline", "coveralls");
    assert_configuration_status(&result, "baseline", ConfigurationStatus::Success);
    assert_pipeline_status(&result, PipelineStatus::Success);
}

/// Steps after a tolerated failure still run normally
#[tokio::test]
async fn test_steps_after_tolerated_failure_run() {
    let yaml = r#"
name: "tolerated"
default_branch: "master"
configurations:
  - name: "only"
    manual_target: true
steps:
  - name: "lint"
    run: "./lint.sh"
    continue_on_error: true
  - name: "test"
    run: "./run_tests.sh"
"#;
    let action = MockAction::passing().fail_step("lint");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_yaml(yaml, action, &event).await;

    assert_step_failed(&result, "only", "lint");
    assert_step_ok(&result, "only", "test");
    assert_pipeline_status(&result, PipelineStatus::Success);
}

/// Later predicates can observe a tolerated failure by step name
#[tokio::test]
async fn test_predicate_observes_tolerated_failure() {
    let yaml = r#"
name: "observed"
default_branch: "master"
configurations:
  - name: "only"
    manual_target: true
steps:
  - name: "lint"
    run: "./lint.sh"
    continue_on_error: true
  - name: "report_lint"
    run: "./report.sh"
    when:
      step_failed: "lint"
"#;
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");

    let failing = MockAction::passing().fail_step("lint");
    let result = run_yaml(yaml, failing, &event).await;
    assert_step_ok(&result, "only", "report_lint");

    let passing = MockAction::passing();
    let result = run_yaml(yaml, passing, &event).await;
    assert_step_skipped(&result, "only", "report_lint", Some("predicate unsatisfied"));
}

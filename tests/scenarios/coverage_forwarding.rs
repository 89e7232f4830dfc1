//! Test: Coverage forwarding - submissions, union merge, finishing signal

use crate::helpers::*;
use matrix_ci::core::{PipelineStatus, TriggerEvent, TriggerKind};

/// Coverage from a successful configuration is submitted and merged
#[tokio::test]
async fn test_coverage_submitted_for_successful_configuration() {
    let action = MockAction::passing().with_coverage(
        "baseline",
        "test",
        coverage_of("openmdao/core.py", &[1, 2, 3]),
    );
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let (result, coverage_sink, _) = run_fixture_with_sinks(action, &event).await;

    let submissions = coverage_sink.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, "baseline");

    let merged = result.coverage.as_ref().unwrap();
    assert_eq!(merged.total_lines_hit(), 3);
}

/// Coverage from a failed configuration never reaches the sink
#[tokio::test]
async fn test_failed_configuration_coverage_discarded() {
    // Coverage lands during install, then the test step hard-fails
    let action = MockAction::passing()
        .with_coverage("baseline", "install", coverage_of("openmdao/core.py", &[1, 2]))
        .fail_step_in("baseline", "test");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let (result, coverage_sink, _) = run_fixture_with_sinks(action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert!(coverage_sink.submissions().is_empty());
    assert!(result.coverage.is_none());
}

/// Merged coverage is the union of per-configuration reports
#[tokio::test]
async fn test_coverage_union_across_configurations() {
    let yaml = r#"
name: "coverage"
default_branch: "master"
configurations:
  - name: "a"
    coverage: true
    manual_target: true
  - name: "b"
    coverage: true
steps:
  - name: "test"
    run: "./run_tests.sh"
"#;
    let action = MockAction::passing()
        .with_coverage("a", "test", coverage_of("lib.py", &[1, 2, 5]))
        .with_coverage("b", "test", coverage_of("lib.py", &[2, 3]));
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let result = run_yaml(yaml, action, &event).await;

    let merged = result.coverage.as_ref().unwrap();
    assert_eq!(merged.total_lines_hit(), 4);
    let file = merged.file("lib.py").unwrap();
    assert!(file.lines.contains(&5));
}

/// The finishing signal fires exactly once for every automatic trigger
#[tokio::test]
async fn test_finish_signal_for_automatic_triggers() {
    for kind in [TriggerKind::Push, TriggerKind::PullRequest, TriggerKind::Scheduled] {
        let event = TriggerEvent::new(kind, "master", "ci");
        let (_, coverage_sink, _) = run_fixture_with_sinks(MockAction::passing(), &event).await;
        assert_eq!(coverage_sink.finish_count(), 1, "trigger {:?}", kind);
    }
}

/// A manual dispatch must not close out the coverage report
#[tokio::test]
async fn test_no_finish_signal_for_manual_dispatch() {
    let event = TriggerEvent::new(TriggerKind::Manual, "master", "dev");
    let (_, coverage_sink, _) = run_fixture_with_sinks(MockAction::passing(), &event).await;
    assert_eq!(coverage_sink.finish_count(), 0);
}

/// The finish signal fires even when configurations failed
#[tokio::test]
async fn test_finish_signal_independent_of_outcomes() {
    let action = MockAction::passing().fail_step("install");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let (result, coverage_sink, _) = run_fixture_with_sinks(action, &event).await;

    assert_pipeline_status(&result, PipelineStatus::Failed);
    assert_eq!(coverage_sink.finish_count(), 1);
}

/// Configurations without coverage enabled submit nothing
#[tokio::test]
async fn test_coverage_disabled_configuration_submits_nothing() {
    // oldest has coverage disabled; a payload from its action is ignored
    let action = MockAction::passing().with_coverage(
        "oldest",
        "test",
        coverage_of("lib.py", &[1]),
    );
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let (result, coverage_sink, _) = run_fixture_with_sinks(action, &event).await;

    assert!(coverage_sink.submissions().is_empty());
    assert!(result.coverage.is_none());
}

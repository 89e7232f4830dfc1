//! Test: Docs artifact forwarding and the publish condition

use crate::helpers::*;
use matrix_ci::core::{TriggerEvent, TriggerKind};

/// Push to the default branch publishes the docs artifact
#[tokio::test]
async fn test_push_to_default_branch_publishes() {
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let (_, _, artifact_sink) = run_fixture_with_sinks(MockAction::passing(), &event).await;

    let accepted = artifact_sink.accepted();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].configuration, "latest");
    assert_eq!(accepted[0].path.to_str(), Some("docs/_build"));

    let published = artifact_sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].configuration, "latest");
}

/// A pull request builds docs but never publishes
#[tokio::test]
async fn test_pull_request_builds_but_does_not_publish() {
    let event = TriggerEvent::new(TriggerKind::PullRequest, "master", "dev");
    let (result, _, artifact_sink) = run_fixture_with_sinks(MockAction::passing(), &event).await;

    assert_step_ok(&result, "latest", "docs");
    assert_eq!(artifact_sink.accepted().len(), 1);
    assert!(artifact_sink.published().is_empty());
}

/// Push to a non-default branch never publishes
#[tokio::test]
async fn test_push_to_feature_branch_does_not_publish() {
    let event = TriggerEvent::new(TriggerKind::Push, "feature/new-solver", "dev");
    let (_, _, artifact_sink) = run_fixture_with_sinks(MockAction::passing(), &event).await;

    assert_eq!(artifact_sink.accepted().len(), 1);
    assert!(artifact_sink.published().is_empty());
}

/// A docs configuration in build-only mode is accepted but never published
#[tokio::test]
async fn test_build_only_docs_mode_does_not_publish() {
    let yaml = r#"
name: "docs-build"
default_branch: "master"
configurations:
  - name: "docs_check"
    docs: "build"
    manual_target: true
steps:
  - name: "docs"
    run: "./build_docs.sh"
    artifact_dir: "docs/_build"
"#;
    let matrix = matrix_from_yaml(yaml);
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");

    let coverage_sink = std::sync::Arc::new(RecordingCoverageSink::default());
    let artifact_sink = std::sync::Arc::new(RecordingArtifactSink::default());
    let engine = matrix_ci::execution::PipelineEngine::new(MockAction::passing())
        .with_coverage_sink(coverage_sink)
        .with_artifact_sink(std::sync::Arc::clone(&artifact_sink) as _);
    engine.run(&matrix, &event).await;

    assert_eq!(artifact_sink.accepted().len(), 1);
    assert!(artifact_sink.published().is_empty());
}

/// A failed docs build leaves nothing to forward
#[tokio::test]
async fn test_failed_docs_build_forwards_nothing() {
    let action = MockAction::passing().fail_step_in("latest", "docs");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");
    let (result, _, artifact_sink) = run_fixture_with_sinks(action, &event).await;

    assert_step_failed(&result, "latest", "docs");
    assert!(artifact_sink.accepted().is_empty());
    assert!(artifact_sink.published().is_empty());
}

/// Docs built before a later hard failure are discarded, not published
#[tokio::test]
async fn test_docs_from_failed_configuration_are_not_forwarded() {
    let yaml = r#"
name: "docs-then-fail"
default_branch: "master"
configurations:
  - name: "docs"
    docs: "publish"
    manual_target: true
steps:
  - name: "build_docs"
    run: "./build_docs.sh"
    artifact_dir: "docs/_build"
  - name: "test"
    run: "./run_tests.sh"
"#;
    let matrix = matrix_from_yaml(yaml);
    let action = MockAction::passing().fail_step_in("docs", "test");
    let event = TriggerEvent::new(TriggerKind::Push, "master", "dev");

    let artifact_sink = std::sync::Arc::new(RecordingArtifactSink::default());
    let engine = matrix_ci::execution::PipelineEngine::new(action)
        .with_artifact_sink(std::sync::Arc::clone(&artifact_sink) as _);
    let result = engine.run(&matrix, &event).await;

    assert_step_ok(&result, "docs", "build_docs");
    assert_configuration_status(&result, "docs", matrix_ci::core::ConfigurationStatus::Failed);
    assert!(artifact_sink.accepted().is_empty());
    assert!(artifact_sink.published().is_empty());
}

/// Manual dispatch of the docs-publishing target still never publishes
#[tokio::test]
async fn test_manual_dispatch_does_not_publish() {
    let event = TriggerEvent::new(TriggerKind::Manual, "master", "dev");
    let (result, _, artifact_sink) = run_fixture_with_sinks(MockAction::passing(), &event).await;

    assert_step_ok(&result, "latest", "docs");
    assert_eq!(artifact_sink.accepted().len(), 1);
    assert!(artifact_sink.published().is_empty());
}

//! Scenario-based tests for matrix-ci

mod budget_and_cancel;
mod coverage_forwarding;
mod failure_handling;
mod gating;
mod publish_forwarding;
mod tolerated_failure;

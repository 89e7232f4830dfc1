//! matrix-ci - a vendor-agnostic conditional build-matrix pipeline controller

pub mod action;
pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod sink;

// Re-export commonly used types
pub use action::{ActionError, ActionReport, Environment, ShellRunner, StepAction};
pub use core::{
    BuildConfiguration, CoverageReport, DocsMode, Matrix, PipelineState, PipelineStatus,
    Predicate, StepDefinition, StepHistory, StepOutcome, TriggerEvent, TriggerKind,
};
pub use execution::{
    ExecutionEvent, PipelineEngine, PipelineResult, SchedulingStrategy,
};
pub use sink::{ArtifactHandle, ArtifactSink, CoverageSink};

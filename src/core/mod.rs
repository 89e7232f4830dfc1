//! Core domain models

pub mod config;
pub mod coverage;
pub mod matrix;
pub mod predicate;
pub mod state;
pub mod step;
pub mod trigger;

pub use coverage::CoverageReport;
pub use matrix::{BuildConfiguration, DocsMode, Matrix};
pub use predicate::{EvalContext, Fact, Predicate};
pub use state::{ConfigurationStatus, PipelineState, PipelineStatus, RunStatus};
pub use step::{StepDefinition, StepHistory, StepOutcome};
pub use trigger::{TriggerEvent, TriggerKind};

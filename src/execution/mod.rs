//! Execution engine: trigger gate, per-configuration executor, aggregation

pub mod aggregate;
pub mod engine;
pub mod executor;
pub mod gate;

pub use aggregate::{aggregate, merge_coverage};
pub use engine::{
    EventHandler, ExecutionEvent, PipelineEngine, PipelineResult, SchedulingStrategy,
};
pub use executor::{ConfigurationExecutor, ConfigurationResult, ExecutionError};
pub use gate::{gate_matrix, should_run, RunDecision};

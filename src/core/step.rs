//! Step domain model and the per-configuration step history log

use crate::core::predicate::Predicate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single step in the shared step sequence
///
/// The sequence is shared across the matrix; `when` decides per configuration
/// whether the step runs. The `run` script is opaque to the controller.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    /// Unique step name
    pub name: String,

    /// Opaque script handed to the step action
    pub run: String,

    /// Predicate deciding whether this step runs
    pub when: Predicate,

    /// A failure of this step does not fail the configuration
    pub continue_on_error: bool,

    /// Coverage payload the action is expected to leave behind, if any
    pub coverage_file: Option<PathBuf>,

    /// Docs artifact directory the action is expected to produce, if any
    pub artifact_dir: Option<PathBuf>,
}

/// Outcome of one step within one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Step ran and the action reported success
    Ok,
    /// Step ran and the action reported failure
    Failed { error: String },
    /// Step never ran (gate, predicate, or a prior hard failure)
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped { .. })
    }
}

/// One entry in the append-only step history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in the step sequence
    pub index: usize,

    /// Step name
    pub step: String,

    /// Recorded outcome
    pub outcome: StepOutcome,

    /// Whether the step was tolerated-on-failure
    pub continue_on_error: bool,

    /// When the action started (None for skipped steps)
    pub started_at: Option<DateTime<Utc>>,

    /// When the outcome was recorded
    pub finished_at: DateTime<Utc>,
}

/// Ordered, append-only log of step outcomes for one configuration
///
/// Predicates query the log by step name. Entries are never mutated after
/// being appended, so a predicate can only observe steps that precede it in
/// configuration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepHistory {
    records: Vec<StepRecord>,
}

impl StepHistory {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Append an outcome for the step at `index`
    pub fn record(
        &mut self,
        index: usize,
        step: &StepDefinition,
        outcome: StepOutcome,
        started_at: Option<DateTime<Utc>>,
    ) {
        self.records.push(StepRecord {
            index,
            step: step.name.clone(),
            outcome,
            continue_on_error: step.continue_on_error,
            started_at,
            finished_at: Utc::now(),
        });
    }

    /// Outcome of a named earlier step, if recorded
    pub fn outcome_of(&self, step: &str) -> Option<&StepOutcome> {
        self.records.iter().find(|r| r.step == step).map(|r| &r.outcome)
    }

    /// Any recorded failure, tolerated or not
    pub fn any_failure(&self) -> bool {
        self.records.iter().any(|r| r.outcome.is_failed())
    }

    /// Any failure of a mandatory (non-tolerated) step
    pub fn any_hard_failure(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.outcome.is_failed() && !r.continue_on_error)
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

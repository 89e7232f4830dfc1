//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Run is currently executing
    Running,
    /// All admitted configurations succeeded
    Success,
    /// At least one configuration failed
    Failed,
    /// Every configuration was gated out
    Skipped,
    /// Run was cancelled
    Cancelled,
}

/// Terminal status of the whole pipeline, as computed by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Failed,
    Skipped,
}

impl From<PipelineStatus> for RunStatus {
    fn from(status: PipelineStatus) -> Self {
        match status {
            PipelineStatus::Success => RunStatus::Success,
            PipelineStatus::Failed => RunStatus::Failed,
            PipelineStatus::Skipped => RunStatus::Skipped,
        }
    }
}

/// Status of a single configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus {
    /// Not yet gated
    Pending,
    /// Gate passed, steps executing
    Running,
    /// All mandatory steps ok or skipped
    Success,
    /// A mandatory step failed, the budget was exceeded, or the run was cancelled
    Failed,
    /// Gate rejected the configuration
    Skipped,
}

impl ConfigurationStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConfigurationStatus::Success | ConfigurationStatus::Failed | ConfigurationStatus::Skipped
        )
    }
}

/// Overall state of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of configurations in the matrix
    pub total_configurations: usize,

    /// Number of configurations that reached Success
    pub succeeded: usize,

    /// Number of configurations that reached Failed
    pub failed: usize,

    /// Number of configurations gated out
    pub skipped: usize,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            total_configurations: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    /// Mark the run as started
    pub fn start(&mut self, total_configurations: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_configurations = total_configurations;
    }

    /// Record a configuration terminal state
    pub fn record_terminal(&mut self, status: ConfigurationStatus) {
        match status {
            ConfigurationStatus::Success => self.succeeded += 1,
            ConfigurationStatus::Failed => self.failed += 1,
            ConfigurationStatus::Skipped => self.skipped += 1,
            _ => {}
        }
    }

    /// Finalize the run with the aggregate status
    pub fn finish(&mut self, status: PipelineStatus) {
        self.status = status.into();
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as cancelled
    pub fn cancel(&mut self) {
        self.status = RunStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }

    /// Fraction of configurations in a terminal state (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_configurations == 0 {
            return 0.0;
        }
        (self.succeeded + self.failed + self.skipped) as f64 / self.total_configurations as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

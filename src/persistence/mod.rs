//! Persistence layer for pipeline run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{RunStatus, TriggerEvent};
use crate::execution::PipelineResult;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Final run status
    pub status: RunStatus,

    /// Trigger kind, branch, and actor, as recorded at dispatch
    pub trigger: String,
    pub branch: String,
    pub actor: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run completed (if complete)
    pub completed_at: Option<DateTime<Utc>>,

    /// Configuration counters
    pub total_configurations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a run summary
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// List all runs for a pipeline, most recent first
    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>>;

    /// Most recent run for a pipeline
    async fn latest_run(&self, pipeline_name: &str) -> Result<Option<RunSummary>>;

    /// List all pipeline names seen so far
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    runs: tokio::sync::RwLock<std::collections::HashMap<Uuid, RunSummary>>,
    by_pipeline: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_pipeline: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.insert(run.run_id, run.clone());

        let mut by_pipeline = self.by_pipeline.write().await;
        by_pipeline
            .entry(run.pipeline_name.clone())
            .or_insert_with(Vec::new)
            .push(run.run_id);

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let by_pipeline = self.by_pipeline.read().await;

        let mut result: Vec<RunSummary> = by_pipeline
            .get(pipeline_name)
            .map(|ids| ids.iter().filter_map(|id| runs.get(id).cloned()).collect())
            .unwrap_or_default();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(result)
    }

    async fn latest_run(&self, pipeline_name: &str) -> Result<Option<RunSummary>> {
        Ok(self.list_runs(pipeline_name).await?.into_iter().next())
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let by_pipeline = self.by_pipeline.read().await;
        Ok(by_pipeline.keys().cloned().collect())
    }
}

/// Create a summary from a finished run
pub fn create_summary(
    pipeline_name: &str,
    event: &TriggerEvent,
    result: &PipelineResult,
) -> RunSummary {
    RunSummary {
        run_id: result.state.run_id,
        pipeline_name: pipeline_name.to_string(),
        status: result.state.status,
        trigger: format!("{:?}", event.kind).to_lowercase(),
        branch: event.branch.clone(),
        actor: event.actor.clone(),
        started_at: result.state.started_at.unwrap_or_else(Utc::now),
        completed_at: result.state.completed_at,
        total_configurations: result.state.total_configurations,
        succeeded: result.state.succeeded,
        failed: result.state.failed,
        skipped: result.state.skipped,
    }
}

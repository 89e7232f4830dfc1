//! Per-configuration state machine over the shared step sequence

use crate::action::{Environment, StepAction};
use crate::core::{
    BuildConfiguration, ConfigurationStatus, CoverageReport, EvalContext, Matrix, StepHistory,
    StepOutcome, TriggerEvent,
};
use crate::execution::engine::ExecutionEvent;
use crate::sink::ArtifactHandle;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Error types for configuration execution
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Configuration '{configuration}' exceeded its wall-clock budget of {budget_secs}s")]
    BudgetExceeded {
        configuration: String,
        budget_secs: u64,
    },

    #[error("Configuration '{0}' was cancelled")]
    Cancelled(String),

    #[error("Configuration '{0}' never reported a terminal state")]
    MissingResult(String),
}

/// Terminal record for one configuration
#[derive(Debug, Clone)]
pub struct ConfigurationResult {
    /// Configuration name
    pub name: String,

    /// Terminal status (Success, Failed, or Skipped)
    pub status: ConfigurationStatus,

    /// Per-step outcomes in sequence order
    pub history: StepHistory,

    /// Merged coverage from this configuration's steps, if any
    pub coverage: Option<CoverageReport>,

    /// Docs artifact this configuration built, if any
    pub artifact: Option<ArtifactHandle>,

    /// Why a non-step condition forced Failed (budget, cancellation)
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ConfigurationResult {
    /// Result for a configuration the trigger gate rejected
    pub fn gated_out(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            status: ConfigurationStatus::Skipped,
            history: StepHistory::new(),
            coverage: None,
            artifact: None,
            error: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Result for a configuration that never reported back (worker panic)
    pub fn unaccounted(name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            error: Some(ExecutionError::MissingResult(name.clone()).to_string()),
            name,
            status: ConfigurationStatus::Failed,
            history: StepHistory::new(),
            coverage: None,
            artifact: None,
            started_at: now,
            finished_at: now,
        }
    }
}

/// What the step loop accumulates besides the history
#[derive(Debug, Default)]
struct Collected {
    coverage: Option<CoverageReport>,
    artifact: Option<ArtifactHandle>,
    cancelled: bool,
}

impl Collected {
    fn merge_coverage(&mut self, report: CoverageReport) {
        match &mut self.coverage {
            Some(existing) => existing.merge(&report),
            None => self.coverage = Some(report),
        }
    }
}

/// Runs one configuration through the shared step sequence
///
/// The whole sequence runs under the configuration's wall-clock budget.
/// When the budget elapses the in-flight step is dropped and the
/// configuration is forced to Failed with whatever history was recorded.
pub struct ConfigurationExecutor<A> {
    action: Arc<A>,
}

impl<A: StepAction + 'static> ConfigurationExecutor<A> {
    pub fn new(action: Arc<A>) -> Self {
        Self { action }
    }

    pub async fn execute(
        &self,
        matrix: &Matrix,
        configuration: &BuildConfiguration,
        event: &TriggerEvent,
        secrets: &HashMap<String, String>,
        cancelled: Arc<AtomicBool>,
        emit: &(dyn Fn(ExecutionEvent) + Send + Sync),
    ) -> ConfigurationResult {
        let started_at = Utc::now();
        info!(
            "Executing configuration {} ({} steps, {}s budget)",
            configuration.name,
            matrix.steps.len(),
            configuration.budget_secs
        );

        // Shared with the budgeted future so a timeout keeps the partial log
        let history = Arc::new(Mutex::new(StepHistory::new()));
        let collected = Arc::new(Mutex::new(Collected::default()));

        let budget = Duration::from_secs(configuration.budget_secs);
        let steps = self.run_steps(
            matrix,
            configuration,
            event,
            secrets,
            cancelled,
            emit,
            Arc::clone(&history),
            Arc::clone(&collected),
        );
        let timed_out = timeout(budget, steps).await.is_err();

        let history = history.lock().await.clone();
        let collected = {
            let mut guard = collected.lock().await;
            std::mem::take(&mut *guard)
        };

        let (status, error) = if timed_out {
            let err = ExecutionError::BudgetExceeded {
                configuration: configuration.name.clone(),
                budget_secs: configuration.budget_secs,
            };
            warn!("{}", err);
            (ConfigurationStatus::Failed, Some(err.to_string()))
        } else if collected.cancelled {
            let err = ExecutionError::Cancelled(configuration.name.clone());
            warn!("{}", err);
            (ConfigurationStatus::Failed, Some(err.to_string()))
        } else if history.any_hard_failure() {
            (ConfigurationStatus::Failed, None)
        } else {
            (ConfigurationStatus::Success, None)
        };

        // No partial credit: coverage and artifacts from a failed
        // configuration are discarded
        let (coverage, artifact) = if status == ConfigurationStatus::Success {
            (collected.coverage, collected.artifact)
        } else {
            (None, None)
        };

        ConfigurationResult {
            name: configuration.name.clone(),
            status,
            history,
            coverage,
            artifact,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        matrix: &Matrix,
        configuration: &BuildConfiguration,
        event: &TriggerEvent,
        secrets: &HashMap<String, String>,
        cancelled: Arc<AtomicBool>,
        emit: &(dyn Fn(ExecutionEvent) + Send + Sync),
        history: Arc<Mutex<StepHistory>>,
        collected: Arc<Mutex<Collected>>,
    ) {
        let environment = Environment::new(secrets.clone());

        for (index, step) in matrix.steps.iter().enumerate() {
            if cancelled.load(Ordering::SeqCst) {
                collected.lock().await.cancelled = true;
                return;
            }

            let skip_reason = {
                let guard = history.lock().await;
                let log: &StepHistory = &guard;
                if log.any_hard_failure() && !step.when.runs_after_failure() {
                    // Diagnostics steps whose predicate observes the failure
                    // still get a chance; everything else is fast-skipped.
                    Some("prior mandatory step failed".to_string())
                } else {
                    let ctx = EvalContext {
                        event,
                        configuration,
                        history: log,
                        default_branch: &matrix.default_branch,
                    };
                    if step.when.evaluate(&ctx) {
                        None
                    } else {
                        Some("predicate unsatisfied".to_string())
                    }
                }
            };

            if let Some(reason) = skip_reason {
                debug!(
                    "Skipping step {} in {}: {}",
                    step.name, configuration.name, reason
                );
                let outcome = StepOutcome::Skipped { reason };
                history.lock().await.record(index, step, outcome.clone(), None);
                emit(ExecutionEvent::StepFinished {
                    configuration: configuration.name.clone(),
                    step: step.name.clone(),
                    outcome,
                });
                continue;
            }

            emit(ExecutionEvent::StepStarted {
                configuration: configuration.name.clone(),
                step: step.name.clone(),
            });
            let step_started = Utc::now();

            let outcome = match self.action.run(step, &environment, configuration).await {
                Ok(report) if report.ok => {
                    let mut guard = collected.lock().await;
                    if configuration.coverage {
                        if let Some(coverage) = report.coverage {
                            guard.merge_coverage(coverage);
                        }
                    }
                    if configuration.docs_mode.builds_docs() {
                        if let Some(dir) = &step.artifact_dir {
                            guard.artifact = Some(ArtifactHandle {
                                configuration: configuration.name.clone(),
                                path: dir.clone(),
                            });
                        }
                    }
                    StepOutcome::Ok
                }
                Ok(report) => StepOutcome::Failed {
                    error: report.detail,
                },
                Err(e) => StepOutcome::Failed {
                    error: e.to_string(),
                },
            };

            if let StepOutcome::Failed { error } = &outcome {
                if step.continue_on_error {
                    info!(
                        "Step {} in {} failed but is tolerated: {}",
                        step.name, configuration.name, error
                    );
                } else {
                    warn!(
                        "Step {} in {} failed: {}",
                        step.name, configuration.name, error
                    );
                }
            }

            history
                .lock()
                .await
                .record(index, step, outcome.clone(), Some(step_started));
            emit(ExecutionEvent::StepFinished {
                configuration: configuration.name.clone(),
                step: step.name.clone(),
                outcome,
            });
        }
    }
}

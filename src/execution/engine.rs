//! Pipeline engine - gates the matrix, fans out configurations, aggregates

use crate::action::StepAction;
use crate::core::{
    ConfigurationStatus, CoverageReport, DocsMode, Matrix, PipelineState, PipelineStatus,
    StepOutcome, TriggerEvent,
};
use crate::execution::aggregate::{aggregate, merge_coverage};
use crate::execution::executor::{ConfigurationExecutor, ConfigurationResult};
use crate::execution::gate::gate_matrix;
use crate::sink::{ArtifactSink, CoverageSink, LoggingArtifactSink, LoggingCoverageSink};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted while a pipeline run progresses
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline: String,
    },
    ConfigurationStarted {
        configuration: String,
    },
    /// Trigger gate rejected the configuration
    ConfigurationSkipped {
        configuration: String,
    },
    StepStarted {
        configuration: String,
        step: String,
    },
    StepFinished {
        configuration: String,
        step: String,
        outcome: StepOutcome,
    },
    /// A configuration reached a terminal state; fires exactly once per
    /// configuration, in completion order
    ConfigurationFinished {
        configuration: String,
        status: ConfigurationStatus,
    },
    PipelineFinished {
        run_id: Uuid,
        status: PipelineStatus,
    },
}

/// Type for event handler callbacks
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// How admitted configurations are scheduled onto workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// One configuration at a time, in matrix order
    Sequential,
    /// At most this many configurations in flight
    LimitedParallel(usize),
    /// Every admitted configuration in flight at once
    Parallel,
}

impl SchedulingStrategy {
    fn semaphore(&self) -> Option<Arc<Semaphore>> {
        match self {
            SchedulingStrategy::Sequential => Some(Arc::new(Semaphore::new(1))),
            SchedulingStrategy::LimitedParallel(n) => Some(Arc::new(Semaphore::new((*n).max(1)))),
            SchedulingStrategy::Parallel => None,
        }
    }
}

/// Everything one run produced
#[derive(Debug)]
pub struct PipelineResult {
    /// Final run bookkeeping (id, counters, timestamps)
    pub state: PipelineState,

    /// Aggregate terminal status
    pub status: PipelineStatus,

    /// Union of coverage from successful configurations, if any reported
    pub coverage: Option<CoverageReport>,

    /// Per-configuration results in matrix order
    pub configurations: Vec<ConfigurationResult>,
}

impl PipelineResult {
    pub fn run_id(&self) -> Uuid {
        self.state.run_id
    }

    pub fn configuration(&self, name: &str) -> Option<&ConfigurationResult> {
        self.configurations.iter().find(|c| c.name == name)
    }
}

/// Drives one pipeline run end to end
///
/// Generic over the step action so tests can script outcomes without
/// spawning processes.
pub struct PipelineEngine<A> {
    executor: Arc<ConfigurationExecutor<A>>,
    strategy: SchedulingStrategy,
    handlers: Vec<EventHandler>,
    coverage_sink: Arc<dyn CoverageSink>,
    artifact_sink: Arc<dyn ArtifactSink>,
    secrets: Arc<HashMap<String, String>>,
    cancelled: Arc<AtomicBool>,
}

impl<A: StepAction + 'static> PipelineEngine<A> {
    pub fn new(action: A) -> Self {
        Self {
            executor: Arc::new(ConfigurationExecutor::new(Arc::new(action))),
            strategy: SchedulingStrategy::Parallel,
            handlers: Vec::new(),
            coverage_sink: Arc::new(LoggingCoverageSink),
            artifact_sink: Arc::new(LoggingArtifactSink),
            secrets: Arc::new(HashMap::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_strategy(mut self, strategy: SchedulingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_coverage_sink(mut self, sink: Arc<dyn CoverageSink>) -> Self {
        self.coverage_sink = sink;
        self
    }

    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifact_sink = sink;
        self
    }

    pub fn with_secrets(mut self, secrets: HashMap<String, String>) -> Self {
        self.secrets = Arc::new(secrets);
        self
    }

    /// Register a callback invoked for every execution event
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Request cancellation; in-flight configurations finish as Failed
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Shared cancellation flag, for wiring to a signal handler
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run the whole matrix for one trigger event
    pub async fn run(&self, matrix: &Matrix, event: &TriggerEvent) -> PipelineResult {
        let mut state = PipelineState::new();
        state.start(matrix.configurations.len());
        info!(
            "Starting pipeline {} (run {}) for {:?} on {} by {}",
            matrix.name, state.run_id, event.kind, event.branch, event.actor
        );

        let emit = self.emitter();
        emit(ExecutionEvent::PipelineStarted {
            run_id: state.run_id,
            pipeline: matrix.name.clone(),
        });

        let decisions = gate_matrix(event, matrix);
        let mut results: Vec<Option<ConfigurationResult>> =
            matrix.configurations.iter().map(|_| None).collect();

        // Gated-out configurations terminate immediately, no worker needed
        for (index, decision) in decisions.iter().enumerate() {
            if !decision.admitted {
                info!("Gate rejected configuration {}", decision.configuration);
                emit(ExecutionEvent::ConfigurationSkipped {
                    configuration: decision.configuration.clone(),
                });
                emit(ExecutionEvent::ConfigurationFinished {
                    configuration: decision.configuration.clone(),
                    status: ConfigurationStatus::Skipped,
                });
                state.record_terminal(ConfigurationStatus::Skipped);
                results[index] = Some(ConfigurationResult::gated_out(&decision.configuration));
            }
        }

        let admitted: Vec<usize> = decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.admitted)
            .map(|(i, _)| i)
            .collect();

        let (tx, mut rx) = mpsc::channel::<(usize, ConfigurationResult)>(admitted.len().max(1));
        let semaphore = self.strategy.semaphore();
        let shared_matrix = Arc::new(matrix.clone());
        let shared_event = Arc::new(event.clone());
        let mut workers = JoinSet::new();

        for index in admitted {
            let executor = Arc::clone(&self.executor);
            let matrix = Arc::clone(&shared_matrix);
            let event = Arc::clone(&shared_event);
            let secrets = Arc::clone(&self.secrets);
            let cancelled = Arc::clone(&self.cancelled);
            let semaphore = semaphore.clone();
            let emit = self.emitter();
            let tx = tx.clone();

            workers.spawn(async move {
                let _permit = match semaphore {
                    Some(s) => s.acquire_owned().await.ok(),
                    None => None,
                };
                let configuration = &matrix.configurations[index];
                emit(ExecutionEvent::ConfigurationStarted {
                    configuration: configuration.name.clone(),
                });
                let result = executor
                    .execute(
                        &matrix,
                        configuration,
                        &event,
                        secrets.as_ref(),
                        cancelled,
                        emit.as_ref(),
                    )
                    .await;
                // Exactly one send per worker; a dropped receiver means the
                // run already gave up on this worker
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        // Barrier: every admitted configuration reports terminal exactly once
        while let Some((index, result)) = rx.recv().await {
            emit(ExecutionEvent::ConfigurationFinished {
                configuration: result.name.clone(),
                status: result.status,
            });
            state.record_terminal(result.status);
            results[index] = Some(result);
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Configuration worker did not finish cleanly: {}", e);
            }
        }

        // A worker that never reported (panic) still must account as Failed
        let results: Vec<ConfigurationResult> = results
            .into_iter()
            .zip(&matrix.configurations)
            .map(|(slot, configuration)| match slot {
                Some(result) => result,
                None => {
                    let result = ConfigurationResult::unaccounted(&configuration.name);
                    emit(ExecutionEvent::ConfigurationFinished {
                        configuration: result.name.clone(),
                        status: result.status,
                    });
                    state.record_terminal(result.status);
                    result
                }
            })
            .collect();

        self.forward_coverage(&results, event).await;
        self.forward_artifacts(&results, matrix, event).await;

        let status = aggregate(&results);
        let coverage = merge_coverage(&results);
        if self.cancelled.load(Ordering::SeqCst) {
            state.cancel();
        } else {
            state.finish(status);
        }

        emit(ExecutionEvent::PipelineFinished {
            run_id: state.run_id,
            status,
        });
        info!(
            "Pipeline {} finished: {:?} ({} succeeded, {} failed, {} skipped)",
            matrix.name, status, state.succeeded, state.failed, state.skipped
        );

        PipelineResult {
            state,
            status,
            coverage,
            configurations: results,
        }
    }

    /// Fan event clones out to every registered handler
    fn emitter(&self) -> Arc<dyn Fn(ExecutionEvent) + Send + Sync> {
        let handlers = self.handlers.clone();
        Arc::new(move |event: ExecutionEvent| {
            for handler in &handlers {
                handler(&event);
            }
        })
    }

    async fn forward_coverage(&self, results: &[ConfigurationResult], event: &TriggerEvent) {
        for result in results {
            if result.status != ConfigurationStatus::Success {
                continue;
            }
            if let Some(report) = &result.coverage {
                if let Err(e) = self.coverage_sink.submit(&result.name, report).await {
                    warn!("Coverage submission for {} failed: {}", result.name, e);
                }
            }
        }

        // The finishing signal tracks the trigger, not the outcomes: manual
        // runs cover one configuration and must not close out the report.
        if event.is_automatic() {
            if let Err(e) = self.coverage_sink.finish().await {
                warn!("Coverage finish signal failed: {}", e);
            }
        }
    }

    async fn forward_artifacts(
        &self,
        results: &[ConfigurationResult],
        matrix: &Matrix,
        event: &TriggerEvent,
    ) {
        for result in results {
            let Some(artifact) = &result.artifact else {
                continue;
            };
            if let Err(e) = self.artifact_sink.accept(artifact).await {
                warn!("Artifact from {} was not accepted: {}", result.name, e);
                continue;
            }

            let publishes = matrix
                .configuration(&result.name)
                .map(|c| c.docs_mode == DocsMode::Publish)
                .unwrap_or(false);
            if publishes && event.is_push_to(&matrix.default_branch) {
                info!("Publishing docs artifact from {}", result.name);
                if let Err(e) = self.artifact_sink.publish(artifact).await {
                    warn!("Artifact publish from {} failed: {}", result.name, e);
                }
            }
        }
    }
}

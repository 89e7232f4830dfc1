//! Step actions - the opaque external collaborators invoked per step

pub mod shell;

use async_trait::async_trait;
pub use shell::ShellRunner;

use crate::core::{BuildConfiguration, CoverageReport, StepDefinition};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Error types for action invocation
///
/// A step that runs and reports failure is not an error; these cover the
/// cases where the action could not be invoked or its result not read.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Failed to spawn action: {0}")]
    Spawn(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What an action reports back to the controller
#[derive(Debug, Clone)]
pub struct ActionReport {
    /// Whether the action succeeded
    pub ok: bool,

    /// Human-readable detail (command output tail, failure reason)
    pub detail: String,

    /// Coverage payload the action produced, if any
    pub coverage: Option<CoverageReport>,
}

impl ActionReport {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
            coverage: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
            coverage: None,
        }
    }

    pub fn with_coverage(mut self, coverage: CoverageReport) -> Self {
        self.coverage = Some(coverage);
        self
    }
}

/// Opaque per-configuration environment handle
///
/// Actions mutate the environment behind this handle (installed packages,
/// exported variables); the controller never inspects it, it only threads
/// the handle through and records what the action reports. Secrets are
/// carried through unexamined.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Unique environment identity
    pub id: Uuid,

    /// Process-wide secrets, passed through to actions as-is
    secrets: HashMap<String, String>,
}

impl Environment {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            secrets,
        }
    }

    /// Hand the secrets to an action (the controller itself never reads them)
    pub fn secrets(&self) -> &HashMap<String, String> {
        &self.secrets
    }
}

/// Trait for step execution - allows for different implementations
#[async_trait]
pub trait StepAction: Send + Sync {
    /// Run one step for one configuration and report the outcome
    async fn run(
        &self,
        step: &StepDefinition,
        environment: &Environment,
        configuration: &BuildConfiguration,
    ) -> Result<ActionReport, ActionError>;
}

//! Shell step action - runs step scripts as subprocesses

use crate::action::{ActionError, ActionReport, Environment, StepAction};
use crate::core::{BuildConfiguration, CoverageReport, StepDefinition};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs each step's script through a shell
///
/// Configuration options are exposed to the script as `MATRIX_<KEY>`
/// environment variables (enabled options only); secrets are exported
/// under their own names, unexamined.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// Shell executable (e.g. "sh", "/bin/bash")
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }

    #[cfg(test)]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Load a coverage payload a step left behind, if it declared one
    async fn load_coverage(&self, step: &StepDefinition) -> Option<CoverageReport> {
        let path = step.coverage_file.as_ref()?;
        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Step {} produced an unreadable coverage payload: {}", step.name, e);
                    None
                }
            },
            Err(e) => {
                warn!(
                    "Step {} declared coverage file {} but it could not be read: {}",
                    step.name,
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl StepAction for ShellRunner {
    async fn run(
        &self,
        step: &StepDefinition,
        environment: &Environment,
        configuration: &BuildConfiguration,
    ) -> Result<ActionReport, ActionError> {
        debug!(
            "Spawning shell for step {} in configuration {}",
            step.name, configuration.name
        );

        let mut command = Command::new(&self.shell);
        command.arg("-c").arg(&step.run).kill_on_drop(true);

        command.env("MATRIX_CONFIGURATION", &configuration.name);
        command.env("MATRIX_ENVIRONMENT_ID", environment.id.to_string());
        for (key, value) in &configuration.options {
            if let Some(value) = value {
                command.env(format!("MATRIX_{}", key.to_uppercase()), value);
            }
        }
        for (key, value) in environment.secrets() {
            command.env(key, value);
        }

        let output = command
            .output()
            .await
            .map_err(|e| ActionError::Spawn(format!("Failed to execute step script: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(
                "Step {} exited with code {}: {}",
                step.name,
                exit_code,
                stderr.trim()
            );
            return Ok(ActionReport::failure(format!(
                "exited with code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Step {} produced {} bytes of output", step.name, stdout.len());

        let mut report = ActionReport::success(stdout.trim().to_string());
        if let Some(coverage) = self.load_coverage(step).await {
            report = report.with_coverage(coverage);
        }
        Ok(report)
    }
}

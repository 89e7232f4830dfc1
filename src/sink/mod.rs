//! External collaborator surfaces for coverage and docs artifacts

use crate::core::CoverageReport;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Handle to a built docs artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    /// Configuration that built the artifact
    pub configuration: String,

    /// Where the artifact was left by the build step
    pub path: PathBuf,
}

/// Receives coverage payloads from successful configurations
///
/// The finishing signal is sent once per run, only for automatic triggers,
/// independent of individual configuration outcomes.
#[async_trait]
pub trait CoverageSink: Send + Sync {
    /// Accept one successful configuration's coverage payload
    async fn submit(&self, configuration: &str, report: &CoverageReport) -> Result<()>;

    /// Signal that no further payloads will arrive for this run
    async fn finish(&self) -> Result<()>;
}

/// Receives docs artifacts; publishing is a separate, stricter path
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Accept a built artifact from any docs-building configuration
    async fn accept(&self, artifact: &ArtifactHandle) -> Result<()>;

    /// Forward an artifact to the publish collaborator
    async fn publish(&self, artifact: &ArtifactHandle) -> Result<()>;
}

/// Coverage sink that only logs what it receives
#[derive(Debug, Default)]
pub struct LoggingCoverageSink;

#[async_trait]
impl CoverageSink for LoggingCoverageSink {
    async fn submit(&self, configuration: &str, report: &CoverageReport) -> Result<()> {
        info!(
            "Coverage from {}: {} lines hit across {} files",
            configuration,
            report.total_lines_hit(),
            report.files().count()
        );
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        info!("Coverage run finished");
        Ok(())
    }
}

/// Artifact sink that only logs what it receives
#[derive(Debug, Default)]
pub struct LoggingArtifactSink;

#[async_trait]
impl ArtifactSink for LoggingArtifactSink {
    async fn accept(&self, artifact: &ArtifactHandle) -> Result<()> {
        info!(
            "Docs artifact from {} at {}",
            artifact.configuration,
            artifact.path.display()
        );
        Ok(())
    }

    async fn publish(&self, artifact: &ArtifactHandle) -> Result<()> {
        info!(
            "Publishing docs artifact from {} at {}",
            artifact.configuration,
            artifact.path.display()
        );
        Ok(())
    }
}

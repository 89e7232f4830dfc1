//! Terminal aggregation over per-configuration results

use crate::core::{ConfigurationStatus, CoverageReport, PipelineStatus};
use crate::execution::executor::ConfigurationResult;

/// Collapse per-configuration terminal states into one pipeline status
///
/// Any failure dominates. Success requires at least one configuration to
/// have actually run; a fully gated-out matrix aggregates to Skipped, as
/// does an empty one.
pub fn aggregate(results: &[ConfigurationResult]) -> PipelineStatus {
    if results.iter().any(|r| r.status == ConfigurationStatus::Failed) {
        return PipelineStatus::Failed;
    }
    if results.iter().any(|r| r.status == ConfigurationStatus::Success) {
        PipelineStatus::Success
    } else {
        PipelineStatus::Skipped
    }
}

/// Union-merge coverage across successful configurations
///
/// Order-independent: merging is a set union per file, so the fan-out's
/// completion order never changes the merged report.
pub fn merge_coverage(results: &[ConfigurationResult]) -> Option<CoverageReport> {
    let mut merged: Option<CoverageReport> = None;
    for result in results {
        if result.status != ConfigurationStatus::Success {
            continue;
        }
        if let Some(report) = &result.coverage {
            match &mut merged {
                Some(existing) => existing.merge(report),
                None => merged = Some(report.clone()),
            }
        }
    }
    merged
}

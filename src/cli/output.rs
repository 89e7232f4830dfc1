//! CLI output formatting

use crate::{
    core::{ConfigurationStatus, PipelineStatus, RunStatus, StepOutcome},
    execution::ExecutionEvent,
    persistence::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the matrix
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Success => style("SUCCESS").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Skipped => style("SKIPPED").dim().to_string(),
        RunStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a configuration status for display
pub fn format_configuration_status(status: ConfigurationStatus) -> String {
    match status {
        ConfigurationStatus::Pending => style("PENDING").dim().to_string(),
        ConfigurationStatus::Running => style("RUNNING").yellow().to_string(),
        ConfigurationStatus::Success => style("SUCCESS").green().to_string(),
        ConfigurationStatus::Failed => style("FAILED").red().to_string(),
        ConfigurationStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run summary line for history listings
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Success => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Skipped => SKIP,
        RunStatus::Running => SPINNER,
        _ => INFO,
    };

    format!(
        "{} {} - {} - {} on {} - {} ({} ok / {} failed / {} skipped)",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.pipeline_name).bold(),
        style(&summary.trigger).cyan(),
        style(&summary.branch).cyan(),
        format_status(summary.status),
        summary.succeeded,
        summary.failed,
        summary.skipped
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted { run_id, pipeline } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(pipeline).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::ConfigurationStarted { configuration } => {
            format!("{} {}", SPINNER, style(configuration).cyan())
        }
        ExecutionEvent::ConfigurationSkipped { configuration } => format!(
            "{} {} {}",
            SKIP,
            style(configuration).dim(),
            style("(gated out)").dim()
        ),
        ExecutionEvent::StepStarted {
            configuration,
            step,
        } => format!(
            "{} {} / {}",
            SPINNER,
            style(configuration).dim(),
            style(step).cyan()
        ),
        ExecutionEvent::StepFinished {
            configuration,
            step,
            outcome,
        } => match outcome {
            StepOutcome::Ok => format!(
                "{} {} / {}",
                CHECK,
                style(configuration).dim(),
                style(step).green()
            ),
            StepOutcome::Failed { error } => format!(
                "{} {} / {}: {}",
                CROSS,
                style(configuration).dim(),
                style(step).red(),
                style(error).dim()
            ),
            StepOutcome::Skipped { reason } => format!(
                "{} {} / {} ({})",
                SKIP,
                style(configuration).dim(),
                style(step).dim(),
                style(reason).dim()
            ),
        },
        ExecutionEvent::ConfigurationFinished {
            configuration,
            status,
        } => format!(
            "{} {} {}",
            INFO,
            style(configuration).bold(),
            format_configuration_status(*status)
        ),
        ExecutionEvent::PipelineFinished { run_id, status } => {
            let status_str = match status {
                PipelineStatus::Success => style("succeeded").green().to_string(),
                PipelineStatus::Failed => style("failed").red().to_string(),
                PipelineStatus::Skipped => style("was fully gated out").dim().to_string(),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

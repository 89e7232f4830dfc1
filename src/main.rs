use anyhow::{Context, Result};
use matrix_ci::cli::commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};
use matrix_ci::cli::output::*;
use matrix_ci::cli::{Cli, Command};
use matrix_ci::core::config::PipelineConfig;
use matrix_ci::core::{PipelineStatus, RunStatus, TriggerEvent};
use matrix_ci::execution::{ExecutionEvent, PipelineEngine};
use matrix_ci::persistence::{create_summary, InMemoryPersistence, PersistenceBackend};
use matrix_ci::ShellRunner;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_pipelines(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config =
        PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline definition")?;
    config.validate()?;
    let matrix = config.to_matrix()?;

    println!("{} Loaded pipeline: {}", INFO, style(&matrix.name).bold());

    let branch = cmd
        .branch
        .clone()
        .unwrap_or_else(|| matrix.default_branch.clone());
    let event = TriggerEvent::new(cmd.event.into(), branch, &cmd.actor);
    println!(
        "{} Trigger: {} on {} by {}",
        INFO,
        style(format!("{:?}", event.kind).to_lowercase()).cyan(),
        style(&event.branch).cyan(),
        style(&event.actor).dim()
    );

    let store = open_store(cmd.no_history).await?;

    let secrets: HashMap<String, String> = cmd.secret.iter().cloned().collect();
    let mut engine = PipelineEngine::new(ShellRunner::default())
        .with_strategy(cmd.strategy.into())
        .with_secrets(secrets);

    // Ctrl-C requests cancellation; in-flight configurations fail out
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let progress = create_progress_bar(matrix.configurations.len());
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        bar.println(format_execution_event(event));
        if matches!(event, ExecutionEvent::ConfigurationFinished { .. }) {
            bar.inc(1);
        }
    });

    println!();
    let result = engine.run(&matrix, &event).await;
    progress.finish_and_clear();

    for configuration in &result.configurations {
        println!(
            "  {} {}",
            style(&configuration.name).bold(),
            format_configuration_status(configuration.status)
        );
        if let Some(error) = &configuration.error {
            println!("    {}", style(error).red());
        }
    }
    if let Some(coverage) = &result.coverage {
        println!(
            "\n{} Merged coverage: {} lines across {} files",
            INFO,
            style(coverage.total_lines_hit()).cyan(),
            style(coverage.files().count()).cyan()
        );
    }

    if !cmd.no_history {
        let summary = create_summary(&matrix.name, &event, &result);
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    match result.status {
        PipelineStatus::Success => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&matrix.name).bold(),
                style("successfully").green()
            );
        }
        PipelineStatus::Skipped => {
            println!(
                "\n{} {} {}",
                SKIP,
                style(&matrix.name).bold(),
                style("ran nothing (all configurations gated out)").dim()
            );
        }
        PipelineStatus::Failed => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&matrix.name).bold(),
                style("failed").red()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file).and_then(|config| {
        config.validate()?;
        config.to_matrix()?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            println!("{} Pipeline definition is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Default branch: {}", style(&config.default_branch).cyan());
            println!(
                "  Configurations: {}",
                style(config.configurations.len()).cyan()
            );
            println!("  Steps: {}", style(config.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

async fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let store = open_store(false).await?;
    let pipelines = store.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{} No pipelines found in history", INFO);
        return Ok(());
    }

    println!("{} Pipelines in history:", INFO);

    for pipeline_name in &pipelines {
        let runs = store.list_runs(pipeline_name).await?;

        if cmd.with_counts {
            let succeeded = runs.iter().filter(|r| r.status == RunStatus::Success).count();
            let failed = runs.iter().filter(|r| r.status == RunStatus::Failed).count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(pipeline_name).bold(),
                style(runs.len()).cyan(),
                style(succeeded).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(pipeline_name).bold());
        }
    }

    if cmd.json {
        let mut json_data = Vec::new();
        for pipeline in &pipelines {
            let runs = store.list_runs(pipeline).await.ok();
            json_data.push(serde_json::json!({
                "name": pipeline,
                "run_count": runs.as_ref().map(|r| r.len()).unwrap_or(0)
            }));
        }
        let data = serde_json::json!({ "pipelines": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store(false).await?;

    // If a specific run is requested
    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.verbose)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = if let Some(pipeline_name) = &cmd.pipeline {
        store
            .list_runs(pipeline_name)
            .await?
            .into_iter()
            .take(cmd.limit)
            .collect()
    } else {
        let pipelines = store.list_pipelines().await?;
        let mut all_runs = Vec::new();
        for pipeline in &pipelines {
            all_runs.extend(store.list_runs(pipeline).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs.into_iter().take(cmd.limit).collect::<Vec<_>>()
    };

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &matrix_ci::persistence::RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Status: {}", format_status(summary.status));
    println!(
        "  Trigger: {} on {} by {}",
        style(&summary.trigger).cyan(),
        style(&summary.branch).cyan(),
        style(&summary.actor).dim()
    );
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Configurations: {} ({} ok / {} failed / {} skipped)",
        summary.total_configurations, summary.succeeded, summary.failed, summary.skipped
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// History store, ephemeral when requested or when built without sqlite
async fn open_store(ephemeral: bool) -> Result<Arc<dyn PersistenceBackend>> {
    #[cfg(feature = "sqlite")]
    if !ephemeral {
        return Ok(Arc::new(
            matrix_ci::persistence::SqliteRunStore::with_default_path().await?,
        ));
    }
    #[cfg(not(feature = "sqlite"))]
    if !ephemeral {
        warn!("Built without the sqlite feature; run history is in-memory only");
    }
    Ok(Arc::new(InMemoryPersistence::new()))
}

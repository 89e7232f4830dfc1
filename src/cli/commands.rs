//! CLI command definitions

use crate::core::TriggerKind;
use crate::execution::SchedulingStrategy;

/// Run the matrix for a trigger event
#[derive(Debug, clap::Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Trigger kind to simulate or relay
    #[arg(long, value_enum, default_value_t = TriggerArg::Manual)]
    pub event: TriggerArg,

    /// Branch the event concerns (defaults to the pipeline's default branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Who or what initiated the event
    #[arg(long, default_value = "local")]
    pub actor: String,

    /// Secrets handed through to step actions (KEY=value)
    #[arg(long, value_parser = parse_key_value)]
    pub secret: Vec<(String, String)>,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Parallel)]
    pub strategy: SchedulingStrategyArg,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Validate a pipeline definition
#[derive(Debug, clap::Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List pipelines seen in run history
#[derive(Debug, clap::Args, Clone)]
pub struct ListCommand {
    /// Show run counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, clap::Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific run by ID
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Trigger kind argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TriggerArg {
    Push,
    #[clap(name = "pull-request")]
    PullRequest,
    Manual,
    Scheduled,
}

impl From<TriggerArg> for TriggerKind {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::Push => TriggerKind::Push,
            TriggerArg::PullRequest => TriggerKind::PullRequest,
            TriggerArg::Manual => TriggerKind::Manual,
            TriggerArg::Scheduled => TriggerKind::Scheduled,
        }
    }
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<SchedulingStrategyArg> for SchedulingStrategy {
    fn from(arg: SchedulingStrategyArg) -> Self {
        match arg {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => SchedulingStrategy::LimitedParallel(4),
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

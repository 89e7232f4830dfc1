//! Pipeline definition from YAML

use crate::core::{
    matrix::{BuildConfiguration, DocsMode, Matrix},
    predicate::{Fact, Predicate},
    step::StepDefinition,
    trigger::TriggerKind,
};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default wall-clock budget per configuration (seconds)
const DEFAULT_BUDGET_SECS: u64 = 3600;

/// Top-level pipeline definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Branch docs publishing is restricted to
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Default wall-clock budget per configuration (seconds)
    #[serde(default)]
    pub budget_secs: Option<u64>,

    /// The configuration matrix
    pub configurations: Vec<ConfigurationConfig>,

    /// Shared step sequence, evaluated per configuration
    pub steps: Vec<StepConfig>,
}

fn default_branch() -> String {
    "main".to_string()
}

/// One matrix entry as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationConfig {
    /// Unique configuration name
    pub name: String,

    /// Option key -> optional value (null disables a declared option)
    #[serde(default)]
    pub options: BTreeMap<String, Option<String>>,

    /// Documentation mode
    #[serde(default = "default_docs_mode")]
    pub docs: DocsMode,

    /// Whether a manual dispatch targets this configuration
    #[serde(default)]
    pub manual_target: bool,

    /// Whether this configuration reports coverage
    #[serde(default)]
    pub coverage: bool,

    /// Budget override for this configuration (seconds)
    #[serde(default)]
    pub budget_secs: Option<u64>,
}

fn default_docs_mode() -> DocsMode {
    DocsMode::None
}

/// One step as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step name
    pub name: String,

    /// Opaque script handed to the step action
    pub run: String,

    /// Run condition (defaults to always)
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub when: Option<PredicateConfig>,

    /// A failure of this step does not fail the configuration
    #[serde(default)]
    pub continue_on_error: bool,

    /// Coverage payload the action leaves behind, if any
    #[serde(default)]
    pub coverage_file: Option<String>,

    /// Docs artifact directory the action produces, if any
    #[serde(default)]
    pub artifact_dir: Option<String>,
}

/// Predicate syntax as it appears in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateConfig {
    Always,
    TriggerIs(String),
    BranchIs(String),
    BranchMatches(String),
    OnDefaultBranch,
    OptionSet(String),
    OptionEquals { key: String, value: String },
    DocsModeIs(String),
    CoverageEnabled,
    PriorStepFailed,
    StepSucceeded(String),
    StepFailed(String),
    All(Vec<PredicateConfig>),
    Any(Vec<PredicateConfig>),
    Not(Box<PredicateConfig>),
}

impl PredicateConfig {
    /// Compile the YAML syntax into the domain predicate
    pub fn compile(&self) -> Result<Predicate> {
        Ok(match self {
            PredicateConfig::Always => Predicate::Always,
            PredicateConfig::TriggerIs(kind) => {
                Predicate::Fact(Fact::TriggerIs(parse_trigger_kind(kind)?))
            }
            PredicateConfig::BranchIs(branch) => Predicate::Fact(Fact::BranchIs(branch.clone())),
            PredicateConfig::BranchMatches(pattern) => {
                let regex = Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("Invalid branch pattern '{}': {}", pattern, e))?;
                Predicate::Fact(Fact::BranchMatches(regex))
            }
            PredicateConfig::OnDefaultBranch => Predicate::Fact(Fact::OnDefaultBranch),
            PredicateConfig::OptionSet(key) => Predicate::Fact(Fact::OptionSet(key.clone())),
            PredicateConfig::OptionEquals { key, value } => Predicate::Fact(Fact::OptionEquals {
                key: key.clone(),
                value: value.clone(),
            }),
            PredicateConfig::DocsModeIs(mode) => {
                Predicate::Fact(Fact::DocsModeIs(parse_docs_mode(mode)?))
            }
            PredicateConfig::CoverageEnabled => Predicate::Fact(Fact::CoverageEnabled),
            PredicateConfig::PriorStepFailed => Predicate::Fact(Fact::PriorStepFailed),
            PredicateConfig::StepSucceeded(step) => {
                Predicate::Fact(Fact::StepSucceeded(step.clone()))
            }
            PredicateConfig::StepFailed(step) => Predicate::Fact(Fact::StepFailed(step.clone())),
            PredicateConfig::All(preds) => {
                Predicate::All(preds.iter().map(|p| p.compile()).collect::<Result<_>>()?)
            }
            PredicateConfig::Any(preds) => {
                Predicate::Any(preds.iter().map(|p| p.compile()).collect::<Result<_>>()?)
            }
            PredicateConfig::Not(pred) => Predicate::Not(Box::new(pred.compile()?)),
        })
    }
}

fn parse_trigger_kind(kind: &str) -> Result<TriggerKind> {
    match kind {
        "push" => Ok(TriggerKind::Push),
        "pull_request" => Ok(TriggerKind::PullRequest),
        "manual" => Ok(TriggerKind::Manual),
        "scheduled" => Ok(TriggerKind::Scheduled),
        other => anyhow::bail!("Unknown trigger kind: '{}'", other),
    }
}

fn parse_docs_mode(mode: &str) -> Result<DocsMode> {
    match mode {
        "none" => Ok(DocsMode::None),
        "build" => Ok(DocsMode::Build),
        "publish" => Ok(DocsMode::Publish),
        other => anyhow::bail!("Unknown docs mode: '{}'", other),
    }
}

impl PipelineConfig {
    /// Load a pipeline definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline definition
    pub fn validate(&self) -> Result<()> {
        // Configuration names must be unique
        let mut seen = std::collections::HashSet::new();
        for config in &self.configurations {
            if !seen.insert(&config.name) {
                anyhow::bail!("Duplicate configuration name: {}", config.name);
            }
        }

        // Exactly one configuration handles manual dispatch
        if !self.configurations.is_empty() {
            let targets: Vec<_> = self
                .configurations
                .iter()
                .filter(|c| c.manual_target)
                .map(|c| c.name.as_str())
                .collect();
            match targets.len() {
                0 => anyhow::bail!("No configuration is marked manual_target"),
                1 => {}
                _ => anyhow::bail!(
                    "Multiple configurations marked manual_target: {}",
                    targets.join(", ")
                ),
            }
        }

        // Step names must be unique
        let mut seen_steps = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen_steps.insert(&step.name) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }
        }

        // Predicates must compile, and may only reference earlier steps
        let mut earlier: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for step in &self.steps {
            if let Some(when) = &step.when {
                let predicate = when.compile().map_err(|e| {
                    anyhow::anyhow!("Step '{}' has an invalid predicate: {}", step.name, e)
                })?;
                for referenced in predicate.referenced_steps() {
                    if !earlier.contains(referenced) {
                        anyhow::bail!(
                            "Step '{}' predicate references step '{}' which does not precede it",
                            step.name,
                            referenced
                        );
                    }
                }
            }
            earlier.insert(&step.name);
        }

        Ok(())
    }

    /// Convert the definition into the domain matrix
    pub fn to_matrix(&self) -> Result<Matrix> {
        let default_budget = self.budget_secs.unwrap_or(DEFAULT_BUDGET_SECS);

        let configurations = self
            .configurations
            .iter()
            .map(|c| BuildConfiguration {
                name: c.name.clone(),
                options: c.options.clone(),
                docs_mode: c.docs,
                manual_target: c.manual_target,
                coverage: c.coverage,
                budget_secs: c.budget_secs.unwrap_or(default_budget),
            })
            .collect();

        let steps = self
            .steps
            .iter()
            .map(|s| {
                Ok(StepDefinition {
                    name: s.name.clone(),
                    run: s.run.clone(),
                    when: match &s.when {
                        Some(when) => when.compile()?,
                        None => Predicate::Always,
                    },
                    continue_on_error: s.continue_on_error,
                    coverage_file: s.coverage_file.as_ref().map(Into::into),
                    artifact_dir: s.artifact_dir.as_ref().map(Into::into),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Matrix {
            name: self.name.clone(),
            default_branch: self.default_branch.clone(),
            configurations,
            steps,
        })
    }
}

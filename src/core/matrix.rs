//! Build matrix domain model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a configuration treats documentation output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocsMode {
    /// Docs are not built
    None,
    /// Docs are built but never published
    Build,
    /// Docs are built and eligible for publishing
    Publish,
}

impl DocsMode {
    /// True if this mode produces a docs artifact at all
    pub fn builds_docs(&self) -> bool {
        matches!(self, DocsMode::Build | DocsMode::Publish)
    }
}

/// A named, fully-parameterized variant of the build
///
/// The option map carries dependency pins and optional-dependency sources.
/// A key mapped to `None` means the option is declared but disabled for this
/// configuration (e.g. a build without the proprietary optimizer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfiguration {
    /// Unique configuration name
    pub name: String,

    /// Option key -> optional value
    pub options: BTreeMap<String, Option<String>>,

    /// Documentation mode for this configuration
    pub docs_mode: DocsMode,

    /// Whether a manual dispatch targets this configuration
    pub manual_target: bool,

    /// Whether this configuration reports coverage
    pub coverage: bool,

    /// Wall-clock budget for the entire step sequence, in seconds
    pub budget_secs: u64,
}

impl BuildConfiguration {
    /// Get an option value, if the option is set and enabled
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_deref())
    }

    /// True if the option is present with a value
    pub fn has_option(&self, key: &str) -> bool {
        self.option(key).is_some()
    }
}

/// The full configuration matrix for one pipeline
///
/// Loaded once at definition time and never mutated. Order is significant
/// only for reporting.
#[derive(Debug, Clone)]
pub struct Matrix {
    /// Pipeline name
    pub name: String,

    /// The branch docs publishing is restricted to
    pub default_branch: String,

    /// Configurations, in reporting order
    pub configurations: Vec<BuildConfiguration>,

    /// Shared ordered step sequence, evaluated per configuration
    pub steps: Vec<crate::core::step::StepDefinition>,
}

impl Matrix {
    /// Get a configuration by name
    pub fn configuration(&self, name: &str) -> Option<&BuildConfiguration> {
        self.configurations.iter().find(|c| c.name == name)
    }

    /// The single configuration a manual dispatch targets
    pub fn manual_target(&self) -> Option<&BuildConfiguration> {
        self.configurations.iter().find(|c| c.manual_target)
    }
}

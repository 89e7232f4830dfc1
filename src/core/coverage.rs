//! Coverage payload model

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Hits recorded for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Line numbers hit at least once
    pub lines: BTreeSet<u32>,

    /// (line, branch index) pairs hit at least once
    pub branches: BTreeSet<(u32, u32)>,
}

/// Coverage reported by one configuration
///
/// Merging is set union per file, so the merged report of N configurations
/// is order-independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record line hits for a file
    pub fn add_lines(&mut self, file: &str, lines: impl IntoIterator<Item = u32>) {
        self.files
            .entry(file.to_string())
            .or_default()
            .lines
            .extend(lines);
    }

    /// Record branch hits for a file
    pub fn add_branches(&mut self, file: &str, branches: impl IntoIterator<Item = (u32, u32)>) {
        self.files
            .entry(file.to_string())
            .or_default()
            .branches
            .extend(branches);
    }

    /// Union-merge another report into this one
    pub fn merge(&mut self, other: &CoverageReport) {
        for (file, coverage) in &other.files {
            let entry = self.files.entry(file.clone()).or_default();
            entry.lines.extend(&coverage.lines);
            entry.branches.extend(&coverage.branches);
        }
    }

    pub fn file(&self, file: &str) -> Option<&FileCoverage> {
        self.files.get(file)
    }

    pub fn files(&self) -> impl Iterator<Item = (&String, &FileCoverage)> {
        self.files.iter()
    }

    /// Total number of distinct line hits across all files
    pub fn total_lines_hit(&self) -> usize {
        self.files.values().map(|f| f.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

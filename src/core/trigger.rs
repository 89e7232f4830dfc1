//! Trigger event model

use serde::{Deserialize, Serialize};

/// What caused a pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Commit pushed to a branch
    Push,
    /// Pull request opened or updated
    PullRequest,
    /// Manually dispatched by a user
    Manual,
    /// Fired by a schedule
    Scheduled,
}

/// Trigger metadata for one pipeline invocation
///
/// Created once at invocation time and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Kind of trigger
    pub kind: TriggerKind,

    /// Branch the event refers to
    pub branch: String,

    /// Who (or what) caused the event
    pub actor: String,
}

impl TriggerEvent {
    pub fn new(kind: TriggerKind, branch: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            kind,
            branch: branch.into(),
            actor: actor.into(),
        }
    }

    /// True for every kind except a manual dispatch
    pub fn is_automatic(&self) -> bool {
        !matches!(self.kind, TriggerKind::Manual)
    }

    /// True if this is a push to the given branch
    pub fn is_push_to(&self, branch: &str) -> bool {
        self.kind == TriggerKind::Push && self.branch == branch
    }
}

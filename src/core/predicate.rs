//! Predicate combinator language for step gating
//!
//! Steps declare their run condition as a small value object of named facts
//! combined with all/any/not, instead of ad-hoc string comparisons. Facts are
//! evaluated against the trigger event, the owning configuration, and the
//! step history recorded so far.

use crate::core::{
    matrix::{BuildConfiguration, DocsMode},
    step::StepHistory,
    trigger::{TriggerEvent, TriggerKind},
};
use regex::Regex;

/// Everything a fact may be evaluated against
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub event: &'a TriggerEvent,
    pub configuration: &'a BuildConfiguration,
    pub history: &'a StepHistory,
    pub default_branch: &'a str,
}

/// A single named boolean condition (not comparable due to Regex)
#[derive(Debug, Clone)]
pub enum Fact {
    /// The trigger has the given kind
    TriggerIs(TriggerKind),
    /// The trigger branch equals the given name
    BranchIs(String),
    /// The trigger branch matches a pattern
    BranchMatches(Regex),
    /// The trigger branch is the pipeline's default branch
    OnDefaultBranch,
    /// The configuration has the option set with a value
    OptionSet(String),
    /// The configuration option equals the given value
    OptionEquals { key: String, value: String },
    /// The configuration's docs mode equals the given mode
    DocsModeIs(DocsMode),
    /// The configuration declares coverage reporting
    CoverageEnabled,
    /// Some earlier step recorded a failure (tolerated or not)
    PriorStepFailed,
    /// The named earlier step recorded Ok
    StepSucceeded(String),
    /// The named earlier step recorded a failure
    StepFailed(String),
}

impl Fact {
    fn evaluate(&self, ctx: &EvalContext) -> bool {
        match self {
            Fact::TriggerIs(kind) => ctx.event.kind == *kind,
            Fact::BranchIs(branch) => ctx.event.branch == *branch,
            Fact::BranchMatches(pattern) => pattern.is_match(&ctx.event.branch),
            Fact::OnDefaultBranch => ctx.event.branch == ctx.default_branch,
            Fact::OptionSet(key) => ctx.configuration.has_option(key),
            Fact::OptionEquals { key, value } => ctx.configuration.option(key) == Some(value.as_str()),
            Fact::DocsModeIs(mode) => ctx.configuration.docs_mode == *mode,
            Fact::CoverageEnabled => ctx.configuration.coverage,
            Fact::PriorStepFailed => ctx.history.any_failure(),
            Fact::StepSucceeded(step) => ctx
                .history
                .outcome_of(step)
                .map(|o| o.is_ok())
                .unwrap_or(false),
            Fact::StepFailed(step) => ctx
                .history
                .outcome_of(step)
                .map(|o| o.is_failed())
                .unwrap_or(false),
        }
    }

    /// True for facts that observe prior failures
    fn observes_failure(&self) -> bool {
        matches!(self, Fact::PriorStepFailed | Fact::StepFailed(_))
    }
}

/// Composable step run condition
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Always satisfied
    Always,
    /// A single fact
    Fact(Fact),
    /// All sub-predicates must hold (short-circuits)
    All(Vec<Predicate>),
    /// At least one sub-predicate must hold (short-circuits)
    Any(Vec<Predicate>),
    /// Negation
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate against trigger, configuration, and recorded history
    pub fn evaluate(&self, ctx: &EvalContext) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Fact(fact) => fact.evaluate(ctx),
            Predicate::All(preds) => preds.iter().all(|p| p.evaluate(ctx)),
            Predicate::Any(preds) => preds.iter().any(|p| p.evaluate(ctx)),
            Predicate::Not(pred) => !pred.evaluate(ctx),
        }
    }

    /// Whether this step still runs after a hard failure
    ///
    /// A step survives the hard-failure fast-skip only when its predicate
    /// positively mentions a prior-failure fact (failure-diagnostics steps).
    pub fn runs_after_failure(&self) -> bool {
        self.mentions_failure(false)
    }

    fn mentions_failure(&self, negated: bool) -> bool {
        match self {
            Predicate::Always => false,
            Predicate::Fact(fact) => !negated && fact.observes_failure(),
            Predicate::All(preds) | Predicate::Any(preds) => {
                preds.iter().any(|p| p.mentions_failure(negated))
            }
            Predicate::Not(pred) => pred.mentions_failure(!negated),
        }
    }

    /// Step names this predicate consults, for back-reference validation
    pub fn referenced_steps(&self) -> Vec<&str> {
        let mut steps = Vec::new();
        self.collect_referenced_steps(&mut steps);
        steps
    }

    fn collect_referenced_steps<'a>(&'a self, steps: &mut Vec<&'a str>) {
        match self {
            Predicate::Fact(Fact::StepSucceeded(step)) | Predicate::Fact(Fact::StepFailed(step)) => {
                steps.push(step)
            }
            Predicate::All(preds) | Predicate::Any(preds) => {
                for p in preds {
                    p.collect_referenced_steps(steps);
                }
            }
            Predicate::Not(pred) => pred.collect_referenced_steps(steps),
            _ => {}
        }
    }
}

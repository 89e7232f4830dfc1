//! Trigger gate - decides which configurations execute at all

use crate::core::{BuildConfiguration, Matrix, TriggerEvent, TriggerKind};

/// Whether a configuration executes for this trigger
///
/// Manual dispatches run only the configuration flagged as the manual
/// target; every automatic trigger admits the whole matrix. Evaluated once
/// per configuration, before any step predicate.
pub fn should_run(event: &TriggerEvent, configuration: &BuildConfiguration) -> bool {
    match event.kind {
        TriggerKind::Manual => configuration.manual_target,
        _ => true,
    }
}

/// Gate verdict for one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDecision {
    pub configuration: String,
    pub admitted: bool,
}

/// Gate the whole matrix, in reporting order
pub fn gate_matrix(event: &TriggerEvent, matrix: &Matrix) -> Vec<RunDecision> {
    matrix
        .configurations
        .iter()
        .map(|c| RunDecision {
            configuration: c.name.clone(),
            admitted: should_run(event, c),
        })
        .collect()
}

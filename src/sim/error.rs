use thiserror::Error;

use crate::net::{FireError, TransitionId};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("the net must be frozen before it can be simulated")]
    NotFrozen,
    #[error("initial marking covers {found} place(s) but the net declares {expected}")]
    MarkingMismatch { expected: usize, found: usize },
    #[error("transition {transition:?} ({name}) is not usable under the {policy} policy")]
    PolicyMismatch {
        transition: TransitionId,
        name: String,
        policy: &'static str,
    },
    #[error("transition {transition:?} ({name}) produced invalid propensity {value}")]
    InvalidPropensity {
        transition: TransitionId,
        name: String,
        value: f64,
    },
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
    /// Enabling evaluator and marking store disagree; always a bug.
    #[error("internal consistency fault: {0}")]
    Fire(#[from] FireError),
}

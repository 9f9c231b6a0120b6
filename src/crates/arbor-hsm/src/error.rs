//! Machine construction and tick-time errors.

use thiserror::Error;

/// Errors raised while assembling or ticking a state machine.
///
/// Construction mistakes (unknown states, invalid probabilities/weights,
/// missing initial state) surface when the machine is built or mutated;
/// [`MachineError::CannotHappen`] is the one tick-time assertion and
/// propagates out of `tick`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MachineError {
    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("no initial state configured")]
    NoInitialState,

    /// A transition marked cannot-happen was reached while armed.
    #[error("cannot-happen transition reached from state '{from}'")]
    CannotHappen { from: String },

    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("weight {0} must be non-negative")]
    InvalidWeight(f64),

    #[error("unknown entry point '{0}'")]
    UnknownEntryPoint(String),

    #[error("state '{0}' is not a composite state")]
    NotComposite(String),

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    /// A builder modifier was used with nothing to modify.
    #[error("builder misuse: {0}")]
    BuilderMisuse(String),
}

//! Errors in the library.
use thiserror::Error;

/// Error conditions raised by the core components.
#[derive(Error, Debug, PartialEq)]
pub enum RrlError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The shape of an observation does not match the configured one.
    #[error("Observation shape mismatch: expected {expected:?}, got {actual:?}")]
    ObservationShape {
        /// Configured shape.
        expected: Vec<usize>,
        /// Shape of the given observation.
        actual: Vec<usize>,
    },

    /// A transition carries a recurrent-state snapshot of the wrong size.
    #[error("Recurrent state size mismatch: expected {expected}, got {actual}")]
    RecurrentStateShape {
        /// Number of elements per tensor of the snapshot.
        expected: usize,
        /// Number of elements in the given snapshot.
        actual: usize,
    },

    /// The buffer stores recurrent states but the transition has none.
    #[error("Transition lacks a recurrent-state snapshot")]
    MissingRecurrentState,

    /// The buffer does not store recurrent states but the transition has one.
    #[error("Transition carries an unexpected recurrent-state snapshot")]
    UnexpectedRecurrentState,

    /// No complete sequence can be cut from the buffer yet.
    #[error("Not enough transitions to sample a sequence of length {0}")]
    NotEnoughTransitions(usize),

    /// The requested schedule cannot produce values of the given type.
    #[error("Schedule {0} is not supported for this value type")]
    UnsupportedSchedule(String),

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

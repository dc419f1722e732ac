//! Errors in the library.
use thiserror::Error;

/// Errors raised by the replay buffer.
///
/// Library functions return [`anyhow::Result`]; the underlying error can be
/// recovered with `err.downcast_ref::<ReplayBufferError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayBufferError {
    /// Sampling was requested from a buffer without transitions.
    #[error("Cannot sample from an empty replay buffer")]
    EmptyBuffer,

    /// State or next state does not conform to the configured shape.
    #[error("State shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Configured state shape.
        expected: Vec<usize>,
        /// Shape of the rejected array.
        actual: Vec<usize>,
    },

    /// Index outside of the valid slots `[0, size)`.
    #[error("Index {index} out of range for replay buffer of size {size}")]
    InvalidIndex {
        /// Rejected index.
        index: usize,
        /// Number of valid slots at the time of the call.
        size: usize,
    },

    /// A parameter is outside of its domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A restored snapshot is internally inconsistent.
    #[error("Corrupt replay buffer snapshot: {0}")]
    CorruptSnapshot(String),
}

//! Error types for the `cybermesh-life` crate.

/// Errors raised by the Life Engine.
///
/// Only preconditions can fail: once a grid exists every operation is
/// total because coordinates are wrapped before use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifeError {
    /// The grid size must be a positive integer.
    #[error("grid size must be positive, got {size}")]
    InvalidSize {
        /// The rejected size.
        size: usize,
    },

    /// No seed pattern with this name exists.
    #[error("unknown seed pattern: {name}")]
    UnknownPattern {
        /// The requested name.
        name: String,
    },
}

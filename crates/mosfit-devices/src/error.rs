//! Error types for device model construction.

use thiserror::Error;

/// Errors raised while committing device parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A parameter is outside the range the model equations accept.
    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for parameter extraction.

use thiserror::Error;

/// Errors that can occur while setting up an extraction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The Vgs, Vds and Id columns of a measurement set differ in length.
    #[error(
        "Measurement set '{set}' has mismatched columns: len(Vgs)={vgs} len(Vds)={vds} len(Id)={id}"
    )]
    MeasurementLengthMismatch {
        set: String,
        vgs: usize,
        vds: usize,
        id: usize,
    },

    /// A bound interval is empty or not a number.
    #[error("Invalid bounds for {parameter}: [{min}, {max}]")]
    InvalidBounds {
        parameter: &'static str,
        min: f64,
        max: f64,
    },

    /// Device model error.
    #[error("Device error: {0}")]
    Device(#[from] mosfit_devices::Error),
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

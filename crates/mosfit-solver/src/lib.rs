//! Parameter extraction for mosfit.
//!
//! This crate provides:
//! - Bounded nonlinear least squares (Levenberg-Marquardt with box
//!   constraints) over any [`ResidualProblem`]
//! - Measurement sets for the subthreshold and on-region point families
//! - The [`ParameterExtractor`] that fits VT0, NFS, KP, THETA and KAPPA of a
//!   LEVEL=3 model to measured drain currents

pub mod error;
pub mod extract;
pub mod least_squares;

pub use error::{Error, Result};
pub use extract::{
    FitBounds, FitParameter, FitReport, MeasurementPoint, MeasurementSet, ParameterExtractor,
    ResidualKind,
};
pub use least_squares::{
    BoxBounds, LeastSquaresConfig, LeastSquaresResult, ResidualProblem, TerminationReason,
    solve_bounded_least_squares,
};

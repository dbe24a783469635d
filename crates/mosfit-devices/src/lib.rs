//! Device models for mosfit.
//!
//! This crate provides:
//! - Physical constants shared by the device equations
//! - The SPICE LEVEL=3 MOSFET DC model with a raw/committed parameter split
//! - A series source/drain resistance wrapper that solves for the internal
//!   terminal voltages
//!
//! Every model implements [`DrainCurrent`], the single forward-evaluation
//! entrypoint used by the parameter extractor and by curve sweeps.

pub mod constants;
pub mod error;
pub mod mosfet;
pub mod series;

pub use error::{Error, Result};
pub use mosfet::DrainCurrent;
pub use mosfet::level3::{Level3EvalResult, Level3Model, Level3Params, Level3Region};
pub use series::{RootSolveConfig, SeriesResistance, TerminalResistanceSolver, TerminalSolution};

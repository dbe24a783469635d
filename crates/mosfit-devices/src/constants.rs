//! Physical constants used by the MOSFET equations.
//!
//! Values match the ones the LEVEL=3 extraction flow has always been
//! calibrated against, so they are deliberately not the CODATA values.

/// Permittivity of silicon (F/m).
pub const EPS_SI: f64 = 1.035943139907e-10;

/// Permittivity of SiO2 (F/m).
pub const EPS_OX: f64 = 3.45314379969e-11;

/// Elementary charge (C).
pub const Q: f64 = 1.6e-19;

/// Boltzmann constant (J/K).
pub const KB: f64 = 1.3806226e-23;

/// Operating temperature (K), 20 °C.
pub const TEMP: f64 = 273.15 + 20.0;

/// Thermal voltage kT/q at [`TEMP`] (V).
pub const VTM: f64 = KB * TEMP / Q;

/// Substrate-source voltage (V). Held at zero for extraction.
pub const VSB: f64 = 0.0;

/// Threshold DIBL coefficient of the LEVEL=3 model (F·m).
pub const DIBL_COEFF: f64 = 8.14e-22;

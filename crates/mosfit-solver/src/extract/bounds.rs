//! Fit parameters and their bound intervals.

use mosfit_devices::Level3Params;
use nalgebra::DVector;

use crate::error::{Error, Result};

/// One of the five LEVEL=3 parameters adjusted by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitParameter {
    /// Zero-bias threshold voltage (V).
    Vt0,
    /// Fast surface state density (cm⁻²V⁻¹).
    Nfs,
    /// Transconductance (A/V²).
    Kp,
    /// Mobility degradation factor (1/V).
    Theta,
    /// Saturation field factor.
    Kappa,
}

impl FitParameter {
    /// All fit parameters in solver vector order.
    pub const ALL: [FitParameter; 5] = [
        FitParameter::Vt0,
        FitParameter::Nfs,
        FitParameter::Kp,
        FitParameter::Theta,
        FitParameter::Kappa,
    ];

    /// SPICE parameter name.
    pub fn name(&self) -> &'static str {
        match self {
            FitParameter::Vt0 => "VT0",
            FitParameter::Nfs => "NFS",
            FitParameter::Kp => "KP",
            FitParameter::Theta => "THETA",
            FitParameter::Kappa => "KAPPA",
        }
    }

    /// Characteristic magnitude used to condition the search.
    pub fn scale(&self) -> f64 {
        match self {
            FitParameter::Vt0 => 0.1,
            FitParameter::Nfs => 100.0,
            FitParameter::Kp => 1.0,
            FitParameter::Theta => 0.1,
            FitParameter::Kappa => 1.0,
        }
    }

    /// Default bound interval `(min, max)`.
    pub fn default_bounds(&self) -> (f64, f64) {
        match self {
            FitParameter::Vt0 => (0.5, 10.0),
            FitParameter::Nfs => (1e6, 1e16),
            FitParameter::Kp => (0.0, 1e4),
            FitParameter::Theta => (0.0, 1e3),
            FitParameter::Kappa => (0.0, 200.0),
        }
    }

    /// Read this parameter from a parameter set.
    pub fn get(&self, params: &Level3Params) -> f64 {
        match self {
            FitParameter::Vt0 => params.vt0,
            FitParameter::Nfs => params.nfs,
            FitParameter::Kp => params.kp,
            FitParameter::Theta => params.theta,
            FitParameter::Kappa => params.kappa,
        }
    }

    /// Write this parameter into a parameter set.
    pub fn set(&self, params: &mut Level3Params, value: f64) {
        match self {
            FitParameter::Vt0 => params.vt0 = value,
            FitParameter::Nfs => params.nfs = value,
            FitParameter::Kp => params.kp = value,
            FitParameter::Theta => params.theta = value,
            FitParameter::Kappa => params.kappa = value,
        }
    }

    fn index(&self) -> usize {
        match self {
            FitParameter::Vt0 => 0,
            FitParameter::Nfs => 1,
            FitParameter::Kp => 2,
            FitParameter::Theta => 3,
            FitParameter::Kappa => 4,
        }
    }
}

impl std::fmt::Display for FitParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-parameter closed bound intervals for a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitBounds {
    intervals: [(f64, f64); 5],
}

impl Default for FitBounds {
    fn default() -> Self {
        Self {
            intervals: FitParameter::ALL.map(|p| p.default_bounds()),
        }
    }
}

impl FitBounds {
    /// Bound interval of `param`.
    pub fn get(&self, param: FitParameter) -> (f64, f64) {
        self.intervals[param.index()]
    }

    /// Replace the interval of `param`. Rejects NaN and empty intervals;
    /// `min == max` pins the parameter.
    pub fn set(&mut self, param: FitParameter, min: f64, max: f64) -> Result<()> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(Error::InvalidBounds {
                parameter: param.name(),
                min,
                max,
            });
        }
        self.intervals[param.index()] = (min, max);
        Ok(())
    }

    /// Builder form of [`FitBounds::set`].
    pub fn with(mut self, param: FitParameter, min: f64, max: f64) -> Result<Self> {
        self.set(param, min, max)?;
        Ok(self)
    }

    /// Lower bounds in solver vector order.
    pub fn lower(&self) -> DVector<f64> {
        DVector::from_iterator(5, self.intervals.iter().map(|&(lo, _)| lo))
    }

    /// Upper bounds in solver vector order.
    pub fn upper(&self) -> DVector<f64> {
        DVector::from_iterator(5, self.intervals.iter().map(|&(_, hi)| hi))
    }

    /// True if `value` lies inside the interval of `param`.
    pub fn contains(&self, param: FitParameter, value: f64) -> bool {
        let (lo, hi) = self.get(param);
        value >= lo && value <= hi
    }
}

/// Characteristic magnitudes in solver vector order.
pub(crate) fn scale_vector() -> DVector<f64> {
    DVector::from_iterator(5, FitParameter::ALL.iter().map(|p| p.scale()))
}

/// Read the fit parameters out of a parameter set in solver vector order.
pub(crate) fn to_vector(params: &Level3Params) -> DVector<f64> {
    DVector::from_iterator(5, FitParameter::ALL.iter().map(|p| p.get(params)))
}

/// Write a solver vector into a parameter set.
pub(crate) fn apply_vector(params: &mut Level3Params, x: &DVector<f64>) {
    for (param, &value) in FitParameter::ALL.iter().zip(x.iter()) {
        param.set(params, value);
    }
}

//! LEVEL=3 model parameters.
//!
//! This module defines the raw (uncommitted) parameter set of the SPICE
//! LEVEL=3 NMOS model. Raw parameters cannot be evaluated directly: they
//! have to go through [`Level3Params::commit`], which validates them and
//! computes the derived quantities the current equation needs.

use super::Level3Model;
use crate::constants::{EPS_OX, VSB};
use crate::error::{Error, Result};

/// LEVEL=3 model parameters in SPICE units.
///
/// Units follow the SPICE model card (cm^-3 for doping, cm^2/V-s for
/// mobility, cm^-2 V^-1 for NFS); conversion to SI happens at commit time.
#[derive(Debug, Clone, PartialEq)]
pub struct Level3Params {
    // ========================================
    // Threshold Voltage Parameters
    // ========================================
    /// Zero-bias threshold voltage (V). Default: 0.0 (computed from process)
    pub vt0: f64,
    /// Body effect factor (V^0.5). Default: 0.5276
    pub gamma: f64,
    /// Surface inversion potential (V). Default: 0.576
    pub phi: f64,
    /// Narrow width factor for adjusting threshold. Default: 0.0
    pub delta: f64,
    /// Static feedback factor for adjusting threshold (DIBL). Default: 0.0
    pub eta: f64,

    // ========================================
    // Mobility and Transconductance
    // ========================================
    /// Transconductance parameter (A/V^2). Default: 0.0 (use U0 and TOX)
    pub kp: f64,
    /// Surface mobility (cm^2/V-s). Default: 600
    pub u0: f64,
    /// Mobility degradation factor (1/V). Default: 0.0
    pub theta: f64,
    /// Maximum carrier drift velocity (m/s). Default: 0.0 (disabled)
    pub vmax: f64,

    // ========================================
    // Geometry and Process
    // ========================================
    /// Effective channel width (m). Default: 100e-6
    pub weff: f64,
    /// Effective channel length (m). Default: 100e-6
    pub leff: f64,
    /// Gate oxide thickness (m). Default: 1e-7
    pub tox: f64,
    /// Substrate doping (cm^-3). Default: 0.0
    pub nsub: f64,
    /// Metallurgical junction depth (m). Default: 0.0
    pub xj: f64,

    // ========================================
    // Output Conductance and Subthreshold
    // ========================================
    /// Saturation field factor (1/V). Default: 0.2
    pub kappa: f64,
    /// Fast surface state density (cm^-2 V^-1). Default: 0.0 (no subthreshold)
    pub nfs: f64,
}

impl Default for Level3Params {
    fn default() -> Self {
        Self {
            vt0: 0.0,
            gamma: 0.5276,
            phi: 0.576,
            delta: 0.0,
            eta: 0.0,
            kp: 0.0,
            u0: 600.0,
            theta: 0.0,
            vmax: 0.0,
            weff: 100e-6,
            leff: 100e-6,
            tox: 1e-7,
            nsub: 0.0,
            xj: 0.0,
            kappa: 0.2,
            nfs: 0.0,
        }
    }
}

impl Level3Params {
    /// Substrate doping in m^-3.
    pub fn nsub_si(&self) -> f64 {
        self.nsub * 1e6
    }

    /// Fast surface state density in m^-2 V^-1.
    pub fn nfs_si(&self) -> f64 {
        self.nfs * 1e4
    }

    /// Surface mobility in m^2/V-s.
    pub fn u0_si(&self) -> f64 {
        self.u0 * 1e-4
    }

    /// Oxide capacitance per unit area (F/m^2).
    pub fn cox(&self) -> f64 {
        EPS_OX / self.tox
    }

    /// Check that every parameter the equations divide by or take a root
    /// of is in range.
    pub fn validate(&self) -> Result<()> {
        positive("TOX", self.tox)?;
        positive("LEFF", self.leff)?;
        positive("WEFF", self.weff)?;
        positive("U0", self.u0)?;
        positive("PHI", self.phi + VSB)?;
        non_negative("NSUB", self.nsub)?;
        non_negative("XJ", self.xj)?;
        non_negative("NFS", self.nfs)?;
        for (name, value) in [
            ("VT0", self.vt0),
            ("GAMMA", self.gamma),
            ("DELTA", self.delta),
            ("ETA", self.eta),
            ("KP", self.kp),
            ("THETA", self.theta),
            ("VMAX", self.vmax),
            ("KAPPA", self.kappa),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }

    /// Validate the parameters and compute the derived quantities.
    ///
    /// This is the only way to obtain an evaluable [`Level3Model`].
    pub fn commit(self) -> Result<Level3Model> {
        self.validate()?;
        Ok(Level3Model::from_validated(self))
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value,
            reason: "must be strictly positive",
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value,
            reason: "must be non-negative",
        })
    }
}

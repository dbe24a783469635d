//! LEVEL=3 derived (pre-calculated) parameters.
//!
//! These are computed once per committed parameter set and reused by every
//! drain current evaluation. They are always recomputed in full.

use std::f64::consts::PI;

use super::params::Level3Params;
use crate::constants::{DIBL_COEFF, EPS_SI, Q, VSB, VTM};

/// Pre-calculated LEVEL=3 parameters derived from model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Level3Derived {
    /// Oxide capacitance per unit area (F/m^2)
    pub cox: f64,
    /// Low-field mobility (m^2/V-s)
    pub u0_si: f64,
    /// Fast surface state density (m^-2 V^-1)
    pub nfs_si: f64,
    /// Depletion layer width per sqrt(V) (m)
    pub xd: f64,
    /// Narrow-width threshold correction factor
    pub fn_: f64,
    /// Short-channel correction factor
    pub fs: f64,
    /// Bulk charge factor used in Vdsat and the current equation
    pub fb: f64,
    /// Subthreshold slope voltage: Von = Vth + fast (V)
    pub fast: f64,
    /// Built-in threshold term (V)
    pub vbi: f64,
    /// Body-effect and narrow-width threshold contribution (V)
    pub vth_body: f64,
    /// DIBL coefficient: Vth shift per volt of Vds
    pub sigma: f64,
}

impl Level3Derived {
    /// Compute derived parameters from model parameters.
    pub fn from_params(p: &Level3Params) -> Self {
        let cox = p.cox();
        let nsub = p.nsub_si();

        let xd = if nsub != 0.0 {
            (2.0 * EPS_SI / (Q * nsub)).sqrt()
        } else {
            0.0
        };

        let fn_ = p.delta / p.weff / 4.0 * 2.0 * PI * EPS_SI / cox;

        let phi_b = p.phi + VSB;
        let sqrt_phi_b = phi_b.sqrt();

        // Short-channel correction from junction depth
        let wp = xd * sqrt_phi_b;
        let fs = if p.xj != 0.0 {
            let ratio = wp / p.xj;
            let wc = p.xj * (0.0631353 + 0.8013292 * ratio - 0.01110777 * ratio * ratio);
            let arg = wp / (p.xj + wp);
            1.0 - p.xj / p.leff * (wc / p.xj * (1.0 - arg * arg).sqrt())
        } else {
            1.0
        };

        let fb = fn_ + p.gamma * fs / (4.0 * sqrt_phi_b);

        let vth_body = p.gamma * fs * sqrt_phi_b + fn_ * phi_b;
        let fast = VTM * (1.0 + Q * p.nfs_si() / cox + vth_body / (2.0 * phi_b));

        let vbi = if p.vt0 == 0.0 {
            fb + p.phi
        } else {
            p.vt0 - p.gamma * p.phi.sqrt()
        };

        let sigma = DIBL_COEFF * p.eta / (cox * p.leff.powi(3));

        Self {
            cox,
            u0_si: p.u0_si(),
            nfs_si: p.nfs_si(),
            xd,
            fn_,
            fs,
            fb,
            fast,
            vbi,
            vth_body,
            sigma,
        }
    }

    /// Threshold voltage at the given drain-source voltage (V).
    #[inline]
    pub fn vth(&self, vds: f64) -> f64 {
        self.vbi - self.sigma * vds + self.vth_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_doping_disables_depletion() {
        let d = Level3Derived::from_params(&Level3Params::default());
        assert_eq!(d.xd, 0.0);
        assert_eq!(d.fs, 1.0);
        assert_eq!(d.fn_, 0.0);
    }

    #[test]
    fn test_depletion_width() {
        let p = Level3Params {
            nsub: 1e15,
            ..Default::default()
        };
        let d = Level3Derived::from_params(&p);
        // sqrt(2 * eps_si / (q * 1e21)) ~ 1.14 um
        assert!((d.xd - 1.138e-6).abs() < 1e-9, "xd = {}", d.xd);
    }

    #[test]
    fn test_threshold_from_vt0() {
        let p = Level3Params {
            vt0: 1.0,
            ..Default::default()
        };
        let d = Level3Derived::from_params(&p);
        // VT0 - GAMMA*sqrt(PHI) + GAMMA*fs*sqrt(PHI) with fs = 1
        assert!((d.vth(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dibl_lowers_threshold() {
        let p = Level3Params {
            vt0: 1.0,
            eta: 1.0,
            leff: 2e-6,
            ..Default::default()
        };
        let d = Level3Derived::from_params(&p);
        assert!(d.sigma > 0.0);
        assert!(d.vth(5.0) < d.vth(0.0));
    }

    #[test]
    fn test_junction_depth_reduces_body_effect() {
        let p = Level3Params {
            nsub: 1e16,
            xj: 0.5e-6,
            leff: 2e-6,
            ..Default::default()
        };
        let d = Level3Derived::from_params(&p);
        assert!(d.fs > 0.0 && d.fs < 1.0, "fs = {}", d.fs);
    }

    #[test]
    fn test_surface_states_increase_slope() {
        let base = Level3Derived::from_params(&Level3Params::default());
        let p = Level3Params {
            nfs: 1e11,
            ..Default::default()
        };
        let d = Level3Derived::from_params(&p);
        assert!(d.fast > base.fast);
        assert!(base.fast > VTM);
    }
}

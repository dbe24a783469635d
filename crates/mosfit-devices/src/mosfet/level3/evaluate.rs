//! LEVEL=3 DC drain current evaluation.
//!
//! The on-region current covers both the linear and the velocity-saturated
//! regions through the effective drain voltage `min(Vds, Vdsat)`. Below the
//! turn-on voltage `Von = Vth + fast` the current is the on-region current
//! at `Von` decaying exponentially with slope `fast`, so both regimes agree
//! at the boundary.

use super::derived::Level3Derived;
use super::params::Level3Params;

/// Operating region of a LEVEL=3 evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level3Region {
    /// Below Von with no fast surface states: no conduction.
    Cutoff,
    /// Below Von: exponential tail.
    Subthreshold,
    /// At or above Von with Vds < Vdsat.
    Linear,
    /// At or above Von with Vds >= Vdsat.
    Saturation,
}

/// Result of a LEVEL=3 DC evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level3EvalResult {
    /// Drain current (A)
    pub ids: f64,
    /// Threshold voltage (V)
    pub vth: f64,
    /// Subthreshold turn-on voltage (V)
    pub von: f64,
    /// Saturation voltage (V). Zero in cutoff.
    pub vdsat: f64,
    /// Channel length reduction after clamping (m)
    pub delta_l: f64,
    /// Operating region
    pub region: Level3Region,
}

/// On-region quantities at a single gate/drain bias.
#[derive(Debug, Clone, Copy)]
struct OnRegion {
    ids: f64,
    vdsat: f64,
    delta_l: f64,
}

/// Evaluate the LEVEL=3 drain current at the given terminal voltages.
pub fn evaluate(p: &Level3Params, d: &Level3Derived, vgs: f64, vds: f64) -> Level3EvalResult {
    let vth = d.vth(vds);
    let von = vth + d.fast;

    if vgs < von {
        if d.nfs_si <= 0.0 {
            return Level3EvalResult {
                ids: 0.0,
                vth,
                von,
                vdsat: 0.0,
                delta_l: 0.0,
                region: Level3Region::Cutoff,
            };
        }
        let on = on_region(p, d, von, vds, vth);
        return Level3EvalResult {
            ids: on.ids * ((vgs - von) / d.fast).exp(),
            vth,
            von,
            vdsat: on.vdsat,
            delta_l: on.delta_l,
            region: Level3Region::Subthreshold,
        };
    }

    let on = on_region(p, d, vgs.max(von), vds, vth);
    let region = if vds < on.vdsat {
        Level3Region::Linear
    } else {
        Level3Region::Saturation
    };
    Level3EvalResult {
        ids: on.ids,
        vth,
        von,
        vdsat: on.vdsat,
        delta_l: on.delta_l,
        region,
    }
}

fn on_region(p: &Level3Params, d: &Level3Derived, vgs: f64, vds: f64, vth: f64) -> OnRegion {
    let vgst = vgs - vth;

    // Surface mobility degraded by the gate field
    let us = d.u0_si / (1.0 + p.theta * vgst);
    let vc = p.vmax * p.leff / us;

    let vsat = vgst / (1.0 + d.fb);
    let vdsat = if p.vmax > 0.0 {
        vsat + vc - (vsat * vsat + vc * vc).sqrt()
    } else {
        vsat
    };
    let vde = vds.min(vdsat);

    let mut ueff = if p.vmax > 0.0 { us / (1.0 + vde / vc) } else { us };
    if p.kp != 0.0 {
        ueff = ueff / d.u0_si / d.cox * p.kp;
    }

    let delta_l = clamp_delta_l(
        channel_length_modulation(p, d, vds, vdsat, vc),
        p.leff,
    );

    let ids = ueff * d.cox * p.weff / p.leff * (vgst - (1.0 + d.fb) / 2.0 * vde) * vde
        / (1.0 - delta_l / p.leff);

    OnRegion {
        ids,
        vdsat,
        delta_l,
    }
}

/// Channel length reduction from drain depletion beyond Vdsat (m), unclamped.
pub(crate) fn channel_length_modulation(
    p: &Level3Params,
    d: &Level3Derived,
    vds: f64,
    vdsat: f64,
    vc: f64,
) -> f64 {
    if vds <= vdsat {
        return 0.0;
    }
    let xd2 = d.xd * d.xd;
    if p.vmax <= 0.0 {
        d.xd * (p.kappa * (vds - vdsat)).sqrt()
    } else {
        // Lateral field at the pinch-off point, scaled by KAPPA as in ngspice
        let ep = p.kappa * vc * (vc + vdsat) / p.leff / vdsat;
        let half = ep * xd2 / 2.0;
        -half + (half * half + p.kappa * xd2 * (vds - vdsat)).sqrt()
    }
}

/// Limit the channel length reduction so that `1 - delta_l/leff` stays
/// positive. Beyond `leff/2` the reduction follows `leff - (leff/2)^2/delta_l`,
/// which approaches but never reaches `leff`.
pub(crate) fn clamp_delta_l(delta_l: f64, leff: f64) -> f64 {
    let half = leff / 2.0;
    if delta_l > half {
        leff - half * half / delta_l
    } else {
        delta_l
    }
}

//! Output and transfer characteristic sweeps.

use mosfit_devices::DrainCurrent;

/// Number of intervals in each sweep.
pub const SWEEP_STEPS: usize = 200;

/// `steps + 1` equally spaced values from 0 to `max`.
pub fn sweep_from_zero(max: f64, steps: usize) -> Vec<f64> {
    if steps == 0 {
        return vec![0.0];
    }
    (0..=steps)
        .map(|i| max / steps as f64 * i as f64)
        .collect()
}

/// One Id(Vds) curve per gate voltage over a shared Vds axis.
#[derive(Debug, Clone)]
pub struct OutputCurves {
    pub vds: Vec<f64>,
    /// `(Vgs, Id)` per curve, `Id` indexed like `vds`.
    pub curves: Vec<(f64, Vec<f64>)>,
}

/// Id(Vgs) at a fixed drain voltage.
#[derive(Debug, Clone)]
pub struct TransferCurve {
    pub vds: f64,
    pub vgs: Vec<f64>,
    pub id: Vec<f64>,
}

/// Evaluate the output characteristics for each `vgs` from Vds = 0 to
/// `vds_max`.
pub fn output_curves<M: DrainCurrent + Sync>(
    device: &M,
    vgs_list: &[f64],
    vds_max: f64,
    steps: usize,
) -> OutputCurves {
    let vds = sweep_from_zero(vds_max, steps);
    let curves = vgs_list
        .iter()
        .map(|&vgs| {
            let bias: Vec<(f64, f64)> = vds.iter().map(|&v| (vgs, v)).collect();
            (vgs, evaluate(device, &bias))
        })
        .collect();
    OutputCurves { vds, curves }
}

/// Evaluate the transfer characteristic from Vgs = 0 to `vgs_max` at `vds`.
pub fn transfer_curve<M: DrainCurrent + Sync>(
    device: &M,
    vds: f64,
    vgs_max: f64,
    steps: usize,
) -> TransferCurve {
    let vgs = sweep_from_zero(vgs_max, steps);
    let bias: Vec<(f64, f64)> = vgs.iter().map(|&g| (g, vds)).collect();
    let id = evaluate(device, &bias);
    TransferCurve { vds, vgs, id }
}

#[cfg(feature = "parallel")]
fn evaluate<M: DrainCurrent + Sync>(device: &M, bias: &[(f64, f64)]) -> Vec<f64> {
    use rayon::prelude::*;
    bias.par_iter()
        .map(|&(vgs, vds)| device.drain_current(vgs, vds))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate<M: DrainCurrent + Sync>(device: &M, bias: &[(f64, f64)]) -> Vec<f64> {
    bias.iter()
        .map(|&(vgs, vds)| device.drain_current(vgs, vds))
        .collect()
}

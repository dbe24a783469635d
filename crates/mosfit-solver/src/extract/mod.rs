//! LEVEL=3 parameter extraction.
//!
//! Fits VT0, NFS, KP, THETA and KAPPA to two measured point families:
//!
//! - **Subthreshold** points, where currents span many decades. Each
//!   residual is `ln(1 + |Id_model - Id_meas|)` so the tail does not swamp
//!   the objective by magnitude alone.
//! - **On-region** points, compared directly as `Id_model - Id_meas`.
//!
//! The forward model is the committed [`Level3Model`] behind a
//! [`TerminalResistanceSolver`]. Every candidate vector is committed into a
//! fresh model, so the extractor's own model only changes once the solve
//! has finished.
//!
//! # Usage
//!
//! ```ignore
//! use mosfit_solver::{MeasurementSet, ParameterExtractor};
//!
//! let sub = MeasurementSet::from_columns("TransferPoints", &vgs, &vds, &id)?;
//! let on = MeasurementSet::from_columns("OutputPoints", &vgs2, &vds2, &id2)?;
//! let mut extractor = ParameterExtractor::new(model, sub, on);
//! if !extractor.run() {
//!     println!("Not Successful");
//! }
//! let fitted = extractor.into_model();
//! ```

pub mod bounds;
pub mod measurement;

pub use bounds::{FitBounds, FitParameter};
pub use measurement::{MeasurementPoint, MeasurementSet};

use std::cell::Cell;

use mosfit_devices::{
    DrainCurrent, Level3Model, RootSolveConfig, SeriesResistance, TerminalResistanceSolver,
};
use nalgebra::DVector;

use crate::error::Result;
use crate::least_squares::{
    BoxBounds, LeastSquaresConfig, ResidualProblem, TerminationReason,
    solve_bounded_least_squares,
};
use bounds::{apply_vector, scale_vector, to_vector};

/// How a measured point contributes to the residual vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualKind {
    /// `ln(1 + |model - measured|)`, for subthreshold points.
    LogCompressed,
    /// `model - measured`, for on-region points.
    Linear,
}

impl ResidualKind {
    /// Residual of one point.
    #[inline]
    pub fn residual(&self, model: f64, measured: f64) -> f64 {
        match self {
            ResidualKind::LogCompressed => (model - measured).abs().ln_1p(),
            ResidualKind::Linear => model - measured,
        }
    }
}

/// Outcome of a completed extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Why the solver stopped.
    pub status: TerminationReason,
    /// Solver iterations.
    pub iterations: usize,
    /// Residual vector evaluations, including finite differences.
    pub evaluations: usize,
    /// Cost `0.5 * ||r||^2` at the start point.
    pub initial_cost: f64,
    /// Cost `0.5 * ||r||^2` at the committed parameters.
    pub final_cost: f64,
    /// Sum of squared residuals at the committed parameters.
    pub residuals: f64,
    /// Series-resistance solves that hit their iteration limit, summed over
    /// every residual evaluation of the fit.
    pub unconverged_solves: usize,
}

impl FitReport {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// The objective seen by the least-squares solver.
struct ExtractionProblem<'a> {
    base: &'a Level3Model,
    resistance: SeriesResistance,
    root_config: &'a RootSolveConfig,
    subthreshold: &'a MeasurementSet,
    on_region: &'a MeasurementSet,
    unconverged: Cell<usize>,
}

impl ExtractionProblem<'_> {
    fn num_residuals(&self) -> usize {
        self.subthreshold.len() + self.on_region.len()
    }

    /// Residuals of `model` seen through the series resistances. Solves
    /// that did not converge are tallied and reported once per call.
    fn residuals_for<M: DrainCurrent>(&self, model: M) -> DVector<f64> {
        let device = TerminalResistanceSolver::new(model, self.resistance)
            .with_config(self.root_config.clone());
        let families = [
            (self.subthreshold, ResidualKind::LogCompressed),
            (self.on_region, ResidualKind::Linear),
        ];

        let points = families
            .into_iter()
            .flat_map(|(set, kind)| set.iter().map(move |p| (p, kind)));

        let mut unconverged = 0;
        let r = DVector::from_iterator(
            self.num_residuals(),
            points.map(|(p, kind)| {
                let solution = device.solve(p.vgs, p.vds);
                if !solution.converged {
                    unconverged += 1;
                }
                kind.residual(solution.current, p.id)
            }),
        );

        if unconverged > 0 {
            log::debug!(
                "{} of {} series resistance solves did not converge",
                unconverged,
                r.len()
            );
            self.unconverged.set(self.unconverged.get() + unconverged);
        }
        r
    }
}

impl ResidualProblem for ExtractionProblem<'_> {
    fn num_params(&self) -> usize {
        FitParameter::ALL.len()
    }

    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let candidate = match self.base.recommit(|p| apply_vector(p, x)) {
            Ok(model) => model,
            Err(e) => {
                log::debug!("Candidate rejected: {}", e);
                return DVector::from_element(self.num_residuals(), f64::NAN);
            }
        };
        self.residuals_for(&candidate)
    }
}

/// Fits the five LEVEL=3 extraction parameters of an owned model to
/// measured data.
#[derive(Debug, Clone)]
pub struct ParameterExtractor {
    model: Level3Model,
    resistance: SeriesResistance,
    root_config: RootSolveConfig,
    subthreshold: MeasurementSet,
    on_region: MeasurementSet,
    bounds: FitBounds,
    config: LeastSquaresConfig,
    report: Option<FitReport>,
}

impl ParameterExtractor {
    /// Create an extractor starting from `model`'s current parameters.
    pub fn new(model: Level3Model, subthreshold: MeasurementSet, on_region: MeasurementSet) -> Self {
        Self {
            model,
            resistance: SeriesResistance::default(),
            root_config: RootSolveConfig::default(),
            subthreshold,
            on_region,
            bounds: FitBounds::default(),
            config: LeastSquaresConfig::default(),
            report: None,
        }
    }

    /// Fit through the given series resistances.
    pub fn with_resistance(mut self, resistance: SeriesResistance) -> Self {
        self.resistance = resistance;
        self
    }

    /// Root-solve settings for the series-resistance model.
    pub fn with_root_config(mut self, config: RootSolveConfig) -> Self {
        self.root_config = config;
        self
    }

    pub fn with_bounds(mut self, bounds: FitBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_config(mut self, config: LeastSquaresConfig) -> Self {
        self.config = config;
        self
    }

    /// Override one parameter's interval.
    pub fn set_bounds(&mut self, param: FitParameter, min: f64, max: f64) -> Result<()> {
        self.bounds.set(param, min, max)
    }

    pub fn bounds(&self) -> &FitBounds {
        &self.bounds
    }

    /// The current model: the start point before [`run`](Self::run), the
    /// solver's final iterate after it.
    pub fn model(&self) -> &Level3Model {
        &self.model
    }

    pub fn into_model(self) -> Level3Model {
        self.model
    }

    pub fn resistance(&self) -> SeriesResistance {
        self.resistance
    }

    /// Sum of squared residuals after the last [`run`](Self::run).
    pub fn residuals(&self) -> Option<f64> {
        self.report.as_ref().map(|r| r.residuals)
    }

    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }

    /// Residual vector of the current model, subthreshold entries first.
    pub fn residual_vector(&self) -> DVector<f64> {
        self.problem().residuals_for(&self.model)
    }

    fn problem(&self) -> ExtractionProblem<'_> {
        ExtractionProblem {
            base: &self.model,
            resistance: self.resistance,
            root_config: &self.root_config,
            subthreshold: &self.subthreshold,
            on_region: &self.on_region,
            unconverged: Cell::new(0),
        }
    }

    /// Perform one bounded least-squares fit.
    ///
    /// The solver's final iterate is committed into the model whether or
    /// not the solve succeeded. Returns whether it succeeded.
    pub fn run(&mut self) -> bool {
        let x0 = to_vector(self.model.params());
        for (param, &value) in FitParameter::ALL.iter().zip(x0.iter()) {
            if !self.bounds.contains(*param, value) {
                let (lo, hi) = self.bounds.get(*param);
                log::warn!(
                    "Start value {}={} outside bounds [{}, {}], clamping",
                    param,
                    value,
                    lo,
                    hi
                );
            }
        }
        if self.subthreshold.is_empty() && self.on_region.is_empty() {
            log::warn!("No measurement points, nothing to fit");
        }

        log::info!(
            "Extracting parameters from {} subthreshold and {} on-region points",
            self.subthreshold.len(),
            self.on_region.len()
        );

        let box_bounds = BoxBounds::new(self.bounds.lower(), self.bounds.upper());
        let problem = self.problem();
        let result =
            solve_bounded_least_squares(&problem, &x0, &box_bounds, &scale_vector(), &self.config);
        let unconverged_solves = problem.unconverged.get();
        if unconverged_solves > 0 {
            log::warn!(
                "{} series resistance solves did not converge during the fit (max_iterations={})",
                unconverged_solves,
                self.root_config.max_iterations
            );
        }

        match self.model.recommit(|p| apply_vector(p, &result.x)) {
            Ok(model) => self.model = model,
            Err(e) => log::warn!("Final parameters could not be committed: {}", e),
        }

        let residuals = result.residuals.norm_squared();
        let report = FitReport {
            status: result.status,
            iterations: result.iterations,
            evaluations: result.evaluations,
            initial_cost: result.initial_cost,
            final_cost: result.cost,
            residuals,
            unconverged_solves,
        };

        if report.success() {
            log::info!(
                "Extraction finished after {} iterations ({}): residuals={:e}",
                report.iterations,
                report.status,
                residuals
            );
        } else {
            log::warn!(
                "Extraction failed after {} iterations ({}): residuals={:e}",
                report.iterations,
                report.status,
                residuals
            );
        }

        let success = report.success();
        self.report = Some(report);
        success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosfit_devices::Level3Params;

    fn model() -> Level3Model {
        Level3Params {
            vt0: 1.0,
            nsub: 1e15,
            nfs: 1e9,
            kp: 20e-6,
            theta: 0.1,
            kappa: 0.2,
            ..Default::default()
        }
        .commit()
        .unwrap()
    }

    fn synthetic(m: &Level3Model, name: &str, bias: &[(f64, f64)]) -> MeasurementSet {
        MeasurementSet::from_points(
            name,
            bias.iter()
                .map(|&(vgs, vds)| MeasurementPoint::new(vgs, vds, m.drain_current(vgs, vds)))
                .collect(),
        )
    }

    #[test]
    fn test_residual_kinds() {
        let r = ResidualKind::Linear.residual(3e-6, 1e-6);
        assert!((r - 2e-6).abs() < 1e-20, "r = {r}");
        let r = ResidualKind::Linear.residual(1e-6, 3e-6);
        assert!((r + 2e-6).abs() < 1e-20, "r = {r}");
        let r = ResidualKind::LogCompressed.residual(1e-6, 3e-6);
        assert!(r > 0.0);
        assert!((r - (2e-6_f64).ln_1p()).abs() < 1e-20);
        assert_eq!(ResidualKind::LogCompressed.residual(5.0, 5.0), 0.0);
    }

    #[test]
    fn test_residual_vector_zero_at_true_parameters() {
        let m = model();
        let sub = synthetic(&m, "sub", &[(0.6, 5.0), (0.8, 5.0)]);
        let on = synthetic(&m, "on", &[(3.0, 1.0), (5.0, 10.0)]);
        let extractor = ParameterExtractor::new(m, sub, on);
        let r = extractor.residual_vector();
        assert_eq!(r.len(), 4);
        assert!(r.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_residual_ordering() {
        let m = model();
        let sub = MeasurementSet::from_points("sub", vec![MeasurementPoint::new(0.6, 5.0, 0.0)]);
        let on = MeasurementSet::from_points("on", vec![MeasurementPoint::new(3.0, 5.0, 0.0)]);
        let extractor = ParameterExtractor::new(m.clone(), sub, on);
        let r = extractor.residual_vector();
        assert_eq!(r[0], m.drain_current(0.6, 5.0).ln_1p());
        assert_eq!(r[1], m.drain_current(3.0, 5.0));
    }

    #[test]
    fn test_invalid_candidate_gives_non_finite_residuals() {
        let m = model();
        let on = synthetic(&m, "on", &[(3.0, 1.0)]);
        let extractor = ParameterExtractor::new(m, MeasurementSet::default(), on);
        let problem = extractor.problem();
        // Negative NFS fails validation
        let x = DVector::from_vec(vec![1.0, -1.0, 20e-6, 0.1, 0.2]);
        assert!(problem.residuals(&x)[0].is_nan());
    }

    #[test]
    fn test_run_at_solution_is_immediately_successful() {
        let m = model();
        let sub = synthetic(&m, "sub", &[(0.6, 5.0), (0.8, 5.0)]);
        let on = synthetic(&m, "on", &[(3.0, 1.0), (5.0, 10.0)]);
        let mut extractor = ParameterExtractor::new(m.clone(), sub, on);
        assert!(extractor.residuals().is_none());
        assert!(extractor.run());
        let report = extractor.report().unwrap();
        assert_eq!(report.status, TerminationReason::ZeroResidual);
        assert_eq!(extractor.residuals(), Some(0.0));
        assert_eq!(extractor.model(), &m);
    }

    #[test]
    fn test_unconverged_series_solves_are_counted() {
        let m = model();
        let resistance = SeriesResistance::new(1000.0, 1000.0);
        let on = synthetic(&m, "on", &[(3.0, 1.0), (5.0, 10.0)]);
        let mut extractor = ParameterExtractor::new(m, MeasurementSet::default(), on)
            .with_resistance(resistance)
            .with_root_config(RootSolveConfig {
                rel_tol: 1e-6,
                max_iterations: 1,
            })
            .with_config(LeastSquaresConfig {
                max_iterations: 2,
                ..Default::default()
            });
        extractor.run();
        let report = extractor.report().unwrap();
        assert!(report.unconverged_solves > 0);
    }

    #[test]
    fn test_converged_fit_reports_no_unconverged_solves() {
        let m = model();
        let sub = synthetic(&m, "sub", &[(0.6, 5.0), (0.8, 5.0)]);
        let on = synthetic(&m, "on", &[(3.0, 1.0), (5.0, 10.0)]);
        let mut extractor = ParameterExtractor::new(m, sub, on);
        extractor.run();
        assert_eq!(extractor.report().unwrap().unconverged_solves, 0);
    }

    #[test]
    fn test_start_point_clamped_into_bounds() {
        let m = model();
        let on = synthetic(&m, "on", &[(3.0, 1.0), (5.0, 10.0)]);
        let mut extractor = ParameterExtractor::new(m, MeasurementSet::default(), on)
            .with_config(LeastSquaresConfig {
                max_iterations: 1,
                ..Default::default()
            });
        extractor.set_bounds(FitParameter::Vt0, 2.0, 3.0).unwrap();
        extractor.run();
        let vt0 = extractor.model().params().vt0;
        assert!((2.0..=3.0).contains(&vt0), "VT0 = {}", vt0);
    }

    #[test]
    fn test_set_bounds_rejects_empty_interval() {
        let m = model();
        let mut extractor =
            ParameterExtractor::new(m, MeasurementSet::default(), MeasurementSet::default());
        assert!(extractor.set_bounds(FitParameter::Kappa, 5.0, 1.0).is_err());
        assert_eq!(extractor.bounds().get(FitParameter::Kappa), (0.0, 200.0));
    }
}

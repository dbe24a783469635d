//! Levenberg-Marquardt iteration with box constraints.
//!
//! The damping is chosen to hold each step inside a trust region measured
//! in `x / scale` units, so variables with a small scale take
//! proportionally small steps while the region is binding.

use nalgebra::DVector;

use super::helpers::{
    column_norms, forward_difference_jacobian, free_variables, gradient_cosine,
    half_squared_norm, scaled_norm, step_is_small, trust_region_step,
};
use super::{BoxBounds, LeastSquaresConfig, ResidualProblem};

/// Smallest ratio of actual to predicted reduction at which a step is
/// accepted.
const ACCEPT_RATIO: f64 = 1e-4;

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The residual vector is exactly zero.
    ZeroResidual,
    /// Relative cost reduction fell below `ftol`.
    Ftol,
    /// Relative step size fell below `xtol`.
    Xtol,
    /// Residual is orthogonal to the free Jacobian columns within `gtol`.
    Gtol,
    /// Iteration limit reached.
    MaxIterations,
    /// The residual at the start point is not finite.
    NonFinite,
    /// The trust region collapsed without finding a finite trial point,
    /// or no step could be computed at all.
    Stalled,
}

impl TerminationReason {
    /// Returns true if this reason counts as a successful solve.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TerminationReason::ZeroResidual
                | TerminationReason::Ftol
                | TerminationReason::Xtol
                | TerminationReason::Gtol
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::ZeroResidual => write!(f, "residual is zero"),
            TerminationReason::Ftol => write!(f, "cost reduction below ftol"),
            TerminationReason::Xtol => write!(f, "step size below xtol"),
            TerminationReason::Gtol => write!(f, "gradient below gtol"),
            TerminationReason::MaxIterations => write!(f, "iteration limit reached"),
            TerminationReason::NonFinite => write!(f, "residual is not finite"),
            TerminationReason::Stalled => write!(f, "no finite trial point near the iterate"),
        }
    }
}

/// Result of a bounded least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquaresResult {
    /// Final parameter vector (the last accepted iterate).
    pub x: DVector<f64>,
    /// Residual vector at `x`.
    pub residuals: DVector<f64>,
    /// Final cost `0.5 * ||r||^2`.
    pub cost: f64,
    /// Cost at the (projected) start point.
    pub initial_cost: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of residual evaluations, including Jacobian columns.
    pub evaluations: usize,
    /// Why the iteration stopped.
    pub status: TerminationReason,
}

impl LeastSquaresResult {
    /// Whether the solver terminated successfully.
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// Minimize `0.5 * ||r(x)||^2` over `bounds`, starting from `x0`.
///
/// `scale` gives the characteristic magnitude of each variable. Steps are
/// bounded by a trust region on `||dx / scale||` whose initial radius is
/// `config.step_bound * ||x0 / scale||`, and the radius grows or shrinks
/// with the agreement between the actual and the predicted cost reduction.
/// The scale also sets the finite-difference step floor and the absolute
/// part of the `xtol` test. A start point outside the box is projected into
/// it.
///
/// Only accepted steps move `x`, so the returned point is the best one
/// evaluated, whether or not the solve succeeded.
pub fn solve_bounded_least_squares(
    problem: &dyn ResidualProblem,
    x0: &DVector<f64>,
    bounds: &BoxBounds,
    scale: &DVector<f64>,
    config: &LeastSquaresConfig,
) -> LeastSquaresResult {
    let n = problem.num_params();
    assert_eq!(x0.len(), n, "start point dimension mismatch");
    assert_eq!(bounds.len(), n, "bounds dimension mismatch");
    assert_eq!(scale.len(), n, "scale dimension mismatch");

    let mut x = bounds.project(x0);
    let mut r = problem.residuals(&x);
    let mut evaluations = 1;
    let mut cost = half_squared_norm(&r);
    let initial_cost = cost;

    let finish = |x: DVector<f64>,
                  r: DVector<f64>,
                  cost: f64,
                  iterations: usize,
                  evaluations: usize,
                  status: TerminationReason| LeastSquaresResult {
        x,
        residuals: r,
        cost,
        initial_cost,
        iterations,
        evaluations,
        status,
    };

    if !cost.is_finite() {
        return finish(x, r, cost, 0, evaluations, TerminationReason::NonFinite);
    }
    if cost == 0.0 {
        return finish(x, r, cost, 0, evaluations, TerminationReason::ZeroResidual);
    }

    let (mut jac, jac_evals) = forward_difference_jacobian(problem, &x, &r, bounds, scale);
    evaluations += jac_evals;

    let diag = DVector::from_fn(n, |i, _| 1.0 / scale[i].abs().max(f64::MIN_POSITIVE));
    let mut radius = config.step_bound * scaled_norm(&x, &diag);
    if !(radius > 0.0 && radius.is_finite()) {
        radius = config.step_bound;
    }
    // Whether the most recent rejected trial had a finite cost
    let mut last_trial_finite = true;
    let mut status = TerminationReason::MaxIterations;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let gradient = jac.tr_mul(&r);
        let norms = column_norms(&jac);
        let free = free_variables(&x, &gradient, &norms, bounds);

        if gradient_cosine(&gradient, &norms, r.norm(), &free) <= config.gtol {
            status = TerminationReason::Gtol;
            break;
        }

        let Some((step, limited)) = trust_region_step(&jac, &r, &norms, &diag, &free, radius)
        else {
            status = TerminationReason::Stalled;
            break;
        };

        let trial = bounds.project(&(&x + &step));
        let dx = &trial - &x;
        if step_is_small(&dx, &x, scale, config.xtol) {
            status = if last_trial_finite {
                TerminationReason::Xtol
            } else {
                TerminationReason::Stalled
            };
            break;
        }
        let step_norm = scaled_norm(&dx, &diag);

        let r_trial = problem.residuals(&trial);
        evaluations += 1;
        let cost_trial = half_squared_norm(&r_trial);

        let predicted = -(gradient.dot(&dx) + 0.5 * (&jac * &dx).norm_squared());
        let actual = cost - cost_trial;
        let rho = if predicted > 0.0 && cost_trial.is_finite() {
            actual / predicted
        } else {
            -1.0
        };

        if rho < 0.25 {
            radius = 0.25 * step_norm;
        } else if rho > 0.75 {
            radius = radius.max(2.0 * step_norm);
        }

        if rho > ACCEPT_RATIO {
            // Only a step the region did not cut short can end the solve on ftol
            let small_reduction = !limited && actual <= config.ftol * cost && rho > 0.25;
            x = trial;
            r = r_trial;
            cost = cost_trial;
            last_trial_finite = true;
            log::debug!(
                "LM iteration {}: cost={:.6e} radius={:.3e} rho={:.3}",
                iterations,
                cost,
                radius,
                rho
            );

            if cost == 0.0 {
                status = TerminationReason::ZeroResidual;
                break;
            }
            if small_reduction {
                status = TerminationReason::Ftol;
                break;
            }

            let (new_jac, jac_evals) = forward_difference_jacobian(problem, &x, &r, bounds, scale);
            jac = new_jac;
            evaluations += jac_evals;
        } else {
            last_trial_finite = cost_trial.is_finite();
        }
    }

    finish(x, r, cost, iterations, evaluations, status)
}

//! Bounded nonlinear least squares.
//!
//! Minimizes `0.5 * ||r(x)||^2` subject to `lower <= x <= upper` with a
//! Levenberg-Marquardt iteration. The Jacobian is approximated by forward
//! differences and the damping is fitted to a trust region on
//! `||dx / scale||`. Variables held at a bound by the gradient are frozen
//! for the step, and trial points are projected back into the box.
//!
//! # Usage
//!
//! ```ignore
//! use mosfit_solver::{BoxBounds, LeastSquaresConfig, solve_bounded_least_squares};
//!
//! let result = solve_bounded_least_squares(&problem, &x0, &bounds, &scale, &LeastSquaresConfig::default());
//! if result.success() {
//!     println!("cost = {}", result.cost);
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`lm`] - The damped iteration and its result types
//! - [`helpers`] - Finite-difference Jacobian, free-variable selection,
//!   trust-region step and step-size tests

pub mod helpers;
pub mod lm;

pub use lm::{LeastSquaresResult, TerminationReason, solve_bounded_least_squares};

use nalgebra::DVector;

/// A residual vector function of a fixed number of parameters.
pub trait ResidualProblem {
    /// Number of parameters.
    fn num_params(&self) -> usize;

    /// Residual vector at `x`. Must always have the same length; entries
    /// may be non-finite when the model cannot be evaluated at `x`.
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64>;
}

/// Least-squares solver configuration.
#[derive(Debug, Clone)]
pub struct LeastSquaresConfig {
    /// Relative cost reduction below which an accepted step terminates.
    pub ftol: f64,
    /// Relative step size below which the iteration terminates.
    pub xtol: f64,
    /// Largest cosine between the residual and a free Jacobian column at
    /// which the iteration terminates.
    pub gtol: f64,
    /// Maximum number of iterations (damped solves).
    pub max_iterations: usize,
    /// Initial trust radius as a multiple of `||x0 / scale||`, or the
    /// radius itself when that norm is zero.
    pub step_bound: f64,
}

impl Default for LeastSquaresConfig {
    fn default() -> Self {
        Self {
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            max_iterations: 200,
            step_bound: 100.0,
        }
    }
}

/// Closed box constraints `lower <= x <= upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxBounds {
    /// Lower bounds.
    pub lower: DVector<f64>,
    /// Upper bounds.
    pub upper: DVector<f64>,
}

impl BoxBounds {
    /// Create box bounds. Both vectors must have the same length.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        assert_eq!(lower.len(), upper.len(), "bound dimension mismatch");
        Self { lower, upper }
    }

    /// Unbounded box of dimension `n`.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: DVector::from_element(n, f64::NEG_INFINITY),
            upper: DVector::from_element(n, f64::INFINITY),
        }
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// True for a zero-dimensional box.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// True if `x` lies inside the box.
    pub fn contains(&self, x: &DVector<f64>) -> bool {
        x.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(&xi, (&lo, &hi))| xi >= lo && xi <= hi)
    }

    /// Clamp `x` into the box.
    pub fn project(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(x.len(), |i, _| x[i].max(self.lower[i]).min(self.upper[i]))
    }
}

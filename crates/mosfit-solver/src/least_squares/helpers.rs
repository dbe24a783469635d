//! Helper routines for the bounded least-squares iteration.

use nalgebra::{DMatrix, DVector};

use super::{BoxBounds, ResidualProblem};

/// Half the squared Euclidean norm, the least-squares cost.
#[inline]
pub fn half_squared_norm(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

/// Finite-difference step for variable `i`.
///
/// The magnitude is `sqrt(eps) * max(|x|, scale)`. The step points away from
/// the nearer bound when the forward step would leave the box, and is zero
/// when the box has no width.
pub fn difference_step(x: f64, lower: f64, upper: f64, scale: f64) -> f64 {
    let h = f64::EPSILON.sqrt() * x.abs().max(scale.abs()).max(f64::MIN_POSITIVE);
    if x + h <= upper {
        h
    } else if x - h >= lower {
        -h
    } else if upper - x >= x - lower {
        upper - x
    } else {
        lower - x
    }
}

/// Forward-difference Jacobian of `problem` at `x`, reusing the residual
/// `r` already computed there.
///
/// Returns the Jacobian and the number of residual evaluations spent.
/// Columns that cannot be differenced or produce non-finite entries are
/// left at zero, which freezes that variable for the next step.
pub fn forward_difference_jacobian(
    problem: &dyn ResidualProblem,
    x: &DVector<f64>,
    r: &DVector<f64>,
    bounds: &BoxBounds,
    scale: &DVector<f64>,
) -> (DMatrix<f64>, usize) {
    let n = x.len();
    let m = r.len();
    let mut jac = DMatrix::zeros(m, n);
    let mut evaluations = 0;

    for j in 0..n {
        let h = difference_step(x[j], bounds.lower[j], bounds.upper[j], scale[j]);
        if h == 0.0 {
            continue;
        }
        let mut xh = x.clone();
        xh[j] += h;
        let rh = problem.residuals(&xh);
        evaluations += 1;

        let column = (rh - r) / h;
        if column.iter().all(|v| v.is_finite()) {
            jac.set_column(j, &column);
        }
    }

    (jac, evaluations)
}

/// Euclidean norm of each Jacobian column.
pub fn column_norms(jac: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_fn(jac.ncols(), |j, _| jac.column(j).norm())
}

/// Variables that may move in the next step.
///
/// A variable sitting on a bound whose descent direction `-gradient` points
/// out of the box is held fixed, as is any variable with a zero column.
pub fn free_variables(
    x: &DVector<f64>,
    gradient: &DVector<f64>,
    norms: &DVector<f64>,
    bounds: &BoxBounds,
) -> Vec<bool> {
    (0..x.len())
        .map(|i| {
            let at_lower = x[i] <= bounds.lower[i] && gradient[i] > 0.0;
            let at_upper = x[i] >= bounds.upper[i] && gradient[i] < 0.0;
            norms[i] > 0.0 && !at_lower && !at_upper
        })
        .collect()
}

/// Largest cosine between the residual and a free Jacobian column.
pub fn gradient_cosine(
    gradient: &DVector<f64>,
    norms: &DVector<f64>,
    r_norm: f64,
    free: &[bool],
) -> f64 {
    if r_norm == 0.0 {
        return 0.0;
    }
    free.iter()
        .enumerate()
        .filter(|&(_, &is_free)| is_free)
        .map(|(i, _)| gradient[i].abs() / (norms[i] * r_norm))
        .fold(0.0, f64::max)
}

/// True if every component of the step is small relative to its variable:
/// `|dx_i| <= xtol * (|x_i| + xtol * scale_i)`.
pub fn step_is_small(dx: &DVector<f64>, x: &DVector<f64>, scale: &DVector<f64>, xtol: f64) -> bool {
    dx.iter()
        .zip(x.iter().zip(scale.iter()))
        .all(|(&d, (&xi, &si))| d.abs() <= xtol * (xi.abs() + xtol * si.abs()))
}

/// Norm of `v` in the scaled metric, `||diag * v||`.
#[inline]
pub fn scaled_norm(v: &DVector<f64>, diag: &DVector<f64>) -> f64 {
    v.component_mul(diag).norm()
}

/// Solve the damped normal equations restricted to the free variables.
///
/// Solves `(J^T J + lambda D^2) dx = -J^T r` with `D = diag(diag)`. The
/// free columns are normalized to unit length before factoring, which
/// keeps the Cholesky factor well conditioned when the columns differ by
/// many orders of magnitude. Returns `None` when the system cannot be
/// factored.
pub fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    norms: &DVector<f64>,
    diag: &DVector<f64>,
    free: &[bool],
    lambda: f64,
) -> Option<DVector<f64>> {
    let n = jac.ncols();
    let active: Vec<usize> = (0..n).filter(|&i| free[i]).collect();
    let mut step = DVector::zeros(n);
    if active.is_empty() {
        return Some(step);
    }

    let k = active.len();
    let scaled = DMatrix::from_fn(jac.nrows(), k, |row, col| {
        let j = active[col];
        jac[(row, j)] / norms[j]
    });

    let mut normal = scaled.tr_mul(&scaled);
    for (i, &j) in active.iter().enumerate() {
        let weight = diag[j] / norms[j];
        normal[(i, i)] += lambda * weight * weight;
    }
    let rhs = -scaled.tr_mul(r);

    let d = normal.cholesky()?.solve(&rhs);
    if !d.iter().all(|v| v.is_finite()) {
        return None;
    }

    for (col, &j) in active.iter().enumerate() {
        step[j] = d[col] / norms[j];
    }
    Some(step)
}

/// Bisection steps allowed when fitting the damping to the trust radius.
const MAX_RADIUS_SEARCH: usize = 60;

/// Step that minimizes the linearized cost within `||diag * dx|| <= radius`.
///
/// The Gauss-Newton step is taken as is when it fits. Otherwise the damping
/// is searched geometrically between zero and `||g / diag|| / radius`,
/// where `g = J^T r`, at which the damped step is guaranteed to lie inside
/// the radius. The search stops once the step length is within 10% of the
/// radius. The flag is true when the radius limited the step. Returns
/// `None` when no damping gives a usable step.
pub fn trust_region_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    norms: &DVector<f64>,
    diag: &DVector<f64>,
    free: &[bool],
    radius: f64,
) -> Option<(DVector<f64>, bool)> {
    if let Some(step) = damped_step(jac, r, norms, diag, free, 0.0) {
        if scaled_norm(&step, diag) <= 1.1 * radius {
            return Some((step, false));
        }
    }

    let gradient = jac.tr_mul(r);
    let mut hi = (0..gradient.len())
        .filter(|&j| free[j])
        .map(|j| (gradient[j] / diag[j]).powi(2))
        .sum::<f64>()
        .sqrt()
        / radius;
    if !(hi > 0.0 && hi.is_finite()) {
        return None;
    }

    let mut lo = 0.0_f64;
    let mut inside = None;
    for _ in 0..MAX_RADIUS_SEARCH {
        let lambda = (lo * hi).sqrt().max(1e-3 * hi);
        let Some(step) = damped_step(jac, r, norms, diag, free, lambda) else {
            lo = lambda;
            continue;
        };
        let length = scaled_norm(&step, diag);
        if (length - radius).abs() <= 0.1 * radius {
            return Some((step, true));
        }
        if length > radius {
            lo = lambda;
        } else {
            hi = lambda;
            inside = Some(step);
        }
    }

    inside
        .or_else(|| damped_step(jac, r, norms, diag, free, hi))
        .map(|step| (step, true))
}

//! Series source/drain resistance.
//!
//! With parasitic resistances `Rd` and `Rs` the intrinsic transistor does not
//! see the applied voltages. Treating the applied drain voltage as a supply
//! `Vcc`, the internal drain-source voltage `v` must satisfy
//!
//! ```text
//! I(v) = (Vcc - v) / (Rd + Rs)
//! Id(Vgs - I(v)*Rs, v) = I(v)
//! ```
//!
//! The residual `Id(Vgs - I*Rs, v) - I(v)` is non-decreasing in `v` and
//! changes sign between `0` and `Vcc`, so the root is bracketed and found
//! with a safeguarded Newton iteration.

use crate::mosfet::DrainCurrent;

/// Parasitic series resistances (ohms).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesResistance {
    /// Drain resistance (ohms). Default: 0.0
    pub rd: f64,
    /// Source resistance (ohms). Default: 0.0
    pub rs: f64,
}

impl SeriesResistance {
    /// Create a series resistance pair.
    pub fn new(rd: f64, rs: f64) -> Self {
        Self { rd, rs }
    }

    /// Total resistance in the drain-source path.
    #[inline]
    pub fn total(&self) -> f64 {
        self.rd + self.rs
    }

    /// True when no resistance is configured and the intrinsic model can be
    /// evaluated directly.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.total() == 0.0
    }
}

/// Root-solve configuration for the internal drain voltage.
#[derive(Debug, Clone)]
pub struct RootSolveConfig {
    /// Relative tolerance on the internal drain voltage.
    pub rel_tol: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for RootSolveConfig {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Solution of the terminal voltage equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalSolution {
    /// Drain current through the resistances (A).
    pub current: f64,
    /// Internal drain-source voltage seen by the intrinsic device (V).
    pub vds_internal: f64,
    /// Internal gate-source voltage seen by the intrinsic device (V).
    pub vgs_internal: f64,
    /// Iterations performed (0 on the bypass path).
    pub iterations: usize,
    /// Whether the iteration met the tolerance. A `false` result still
    /// carries the last iterate, which may be imprecise.
    pub converged: bool,
}

/// Transistor with series source/drain resistance, composed over any
/// intrinsic [`DrainCurrent`] model.
#[derive(Debug, Clone)]
pub struct TerminalResistanceSolver<M> {
    model: M,
    resistance: SeriesResistance,
    config: RootSolveConfig,
}

impl<M: DrainCurrent> TerminalResistanceSolver<M> {
    /// Wrap an intrinsic model with the given series resistances.
    pub fn new(model: M, resistance: SeriesResistance) -> Self {
        Self {
            model,
            resistance,
            config: RootSolveConfig::default(),
        }
    }

    /// Use a custom root-solve configuration.
    pub fn with_config(mut self, config: RootSolveConfig) -> Self {
        self.config = config;
        self
    }

    /// The intrinsic model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The configured resistances.
    pub fn resistance(&self) -> SeriesResistance {
        self.resistance
    }

    /// Unwrap the intrinsic model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Solve for the terminal current at applied `vgs`, `vds`.
    pub fn solve(&self, vgs: f64, vds: f64) -> TerminalSolution {
        if self.resistance.is_zero() {
            return TerminalSolution {
                current: self.model.drain_current(vgs, vds),
                vds_internal: vds,
                vgs_internal: vgs,
                iterations: 0,
                converged: true,
            };
        }

        let vcc = vds;
        let r_total = self.resistance.total();
        let rs = self.resistance.rs;
        let current_at = |v: f64| (vcc - v) / r_total;
        let residual = |v: f64| {
            let i = current_at(v);
            self.model.drain_current(vgs - i * rs, v) - i
        };

        let (v, iterations, converged) = self.find_root(vcc, residual);
        let current = current_at(v);
        TerminalSolution {
            current,
            vds_internal: v,
            vgs_internal: vgs - current * rs,
            iterations,
            converged,
        }
    }

    /// Safeguarded Newton iteration on the bracket `[min(0,Vcc), max(0,Vcc)]`,
    /// starting from `Vcc`. Falls back to bisection whenever the Newton step
    /// leaves the bracket or the slope vanishes.
    fn find_root(&self, vcc: f64, f: impl Fn(f64) -> f64) -> (f64, usize, bool) {
        let mut lo = vcc.min(0.0);
        let mut hi = vcc.max(0.0);
        if lo == hi {
            return (vcc, 0, true);
        }

        let f_lo = f(lo);
        let f_hi = f(hi);
        if f_lo == 0.0 {
            return (lo, 0, true);
        }
        if f_hi == 0.0 {
            return (hi, 0, true);
        }
        // Orient the bracket so that f(lo) < 0 < f(hi)
        if f_lo > 0.0 {
            std::mem::swap(&mut lo, &mut hi);
        }

        let tol = self.config.rel_tol;
        let mut v = vcc;
        let mut fv = f(v);

        for iter in 1..=self.config.max_iterations {
            if fv < 0.0 {
                lo = v;
            } else {
                hi = v;
            }

            let h = 1e-7 * v.abs().max(1e-3);
            let slope = (f(v + h) - f(v - h)) / (2.0 * h);

            let newton = v - fv / slope;
            let in_bracket = slope.is_finite()
                && slope != 0.0
                && newton > lo.min(hi)
                && newton < lo.max(hi);
            let next = if in_bracket { newton } else { 0.5 * (lo + hi) };

            let step = (next - v).abs();
            v = next;
            fv = f(v);

            if fv == 0.0 || step <= tol * v.abs().max(tol) {
                return (v, iter, true);
            }
        }

        (v, self.config.max_iterations, false)
    }
}

impl<M: DrainCurrent> DrainCurrent for TerminalResistanceSolver<M> {
    fn drain_current(&self, vgs: f64, vds: f64) -> f64 {
        let solution = self.solve(vgs, vds);
        if !solution.converged {
            log::warn!(
                "Series resistance solve did not converge at Vgs={} Vds={} after {} iterations (Vds_int={})",
                vgs,
                vds,
                solution.iterations,
                solution.vds_internal
            );
        }
        solution.current
    }
}

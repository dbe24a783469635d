//! SPICE LEVEL=3 MOSFET model (NMOS, DC only).
//!
//! The semi-empirical short-channel model: body effect, short-channel and
//! narrow-width threshold corrections, drain-induced barrier lowering,
//! gate-field mobility degradation, velocity saturation, channel-length
//! modulation and an exponential subthreshold tail controlled by NFS.
//!
//! # Usage
//!
//! ```
//! use mosfit_devices::{DrainCurrent, Level3Params};
//!
//! let model = Level3Params {
//!     vt0: 1.0,
//!     kp: 20e-6,
//!     nfs: 1e9,
//!     ..Default::default()
//! }
//! .commit()
//! .unwrap();
//!
//! assert!(model.drain_current(3.0, 5.0) > 0.0);
//! ```
//!
//! Parameters are raw until committed. To change them, take them back out
//! with [`Level3Model::into_params`] or derive a new model with
//! [`Level3Model::recommit`].

pub mod derived;
pub mod evaluate;
pub mod params;

pub use derived::Level3Derived;
pub use evaluate::{Level3EvalResult, Level3Region, evaluate as level3_evaluate};
pub use params::Level3Params;

use super::DrainCurrent;
use crate::error::Result;

/// A committed LEVEL=3 model: validated parameters plus their derived cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Level3Model {
    params: Level3Params,
    derived: Level3Derived,
}

impl Level3Model {
    fn from_validated(params: Level3Params) -> Self {
        let derived = Level3Derived::from_params(&params);
        Self { params, derived }
    }

    /// The committed model parameters.
    pub fn params(&self) -> &Level3Params {
        &self.params
    }

    /// The derived quantities computed at commit time.
    pub fn derived(&self) -> &Level3Derived {
        &self.derived
    }

    /// Give the parameters back for editing. They must be committed again
    /// before they can be evaluated.
    pub fn into_params(self) -> Level3Params {
        self.params
    }

    /// Build a new committed model from a modified copy of these parameters.
    pub fn recommit(&self, edit: impl FnOnce(&mut Level3Params)) -> Result<Self> {
        let mut params = self.params.clone();
        edit(&mut params);
        params.commit()
    }

    /// Evaluate current, threshold, saturation voltage and region.
    pub fn evaluate(&self, vgs: f64, vds: f64) -> Level3EvalResult {
        level3_evaluate(&self.params, &self.derived, vgs, vds)
    }
}

impl Default for Level3Model {
    fn default() -> Self {
        Self::from_validated(Level3Params::default())
    }
}

impl DrainCurrent for Level3Model {
    fn drain_current(&self, vgs: f64, vds: f64) -> f64 {
        self.evaluate(vgs, vds).ids
    }
}

//! MOSFET device models.

pub mod level3;

/// Forward DC evaluation of a transistor: drain current at the given
/// gate-source and drain-source voltages.
///
/// This is the only entrypoint curve sweeps and the parameter extractor use.
pub trait DrainCurrent {
    /// Drain current (A) at `vgs`, `vds` (V).
    fn drain_current(&self, vgs: f64, vds: f64) -> f64;
}

impl<T: DrainCurrent + ?Sized> DrainCurrent for &T {
    fn drain_current(&self, vgs: f64, vds: f64) -> f64 {
        (**self).drain_current(vgs, vds)
    }
}

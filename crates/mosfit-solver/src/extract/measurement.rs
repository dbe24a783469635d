//! Measured (Vgs, Vds, Id) point sets.

use crate::error::{Error, Result};

/// A single measured bias point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementPoint {
    /// Gate-source voltage (V).
    pub vgs: f64,
    /// Drain-source voltage (V).
    pub vds: f64,
    /// Measured drain current (A).
    pub id: f64,
}

impl MeasurementPoint {
    pub fn new(vgs: f64, vds: f64, id: f64) -> Self {
        Self { vgs, vds, id }
    }
}

/// An ordered, named sequence of measured points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementSet {
    name: String,
    points: Vec<MeasurementPoint>,
}

impl MeasurementSet {
    /// Build a set from three parallel columns.
    ///
    /// The columns must have equal length; otherwise nothing is built and
    /// the lengths are reported.
    pub fn from_columns(
        name: impl Into<String>,
        vgs: &[f64],
        vds: &[f64],
        id: &[f64],
    ) -> Result<Self> {
        let name = name.into();
        if vgs.len() != vds.len() || vds.len() != id.len() {
            return Err(Error::MeasurementLengthMismatch {
                set: name,
                vgs: vgs.len(),
                vds: vds.len(),
                id: id.len(),
            });
        }
        let points = vgs
            .iter()
            .zip(vds)
            .zip(id)
            .map(|((&vgs, &vds), &id)| MeasurementPoint { vgs, vds, id })
            .collect();
        Ok(Self { name, points })
    }

    /// Build a set from points.
    pub fn from_points(name: impl Into<String>, points: Vec<MeasurementPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[MeasurementPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MeasurementPoint> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a MeasurementSet {
    type Item = &'a MeasurementPoint;
    type IntoIter = std::slice::Iter<'a, MeasurementPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns() {
        let set = MeasurementSet::from_columns("OutputPoints", &[1.0, 2.0], &[5.0, 5.0], &[1e-6, 2e-6])
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.name(), "OutputPoints");
        assert_eq!(set.points()[1], MeasurementPoint::new(2.0, 5.0, 2e-6));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = MeasurementSet::from_columns("TransferPoints", &[1.0, 2.0, 3.0], &[5.0; 3], &[1e-9, 2e-9])
            .unwrap_err();
        assert_eq!(
            err,
            Error::MeasurementLengthMismatch {
                set: "TransferPoints".to_string(),
                vgs: 3,
                vds: 3,
                id: 2,
            }
        );
        assert!(err.to_string().contains("len(Id)=2"));
    }

    #[test]
    fn test_empty_set() {
        let set = MeasurementSet::from_columns("empty", &[], &[], &[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}

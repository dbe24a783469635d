//! JSON run configuration.
//!
//! # Format
//!
//! ```json
//! {
//!   "Parameters": { "optimize": true, "VT0": 1.0, "NFS": 1e9, "Rd": 10.0, "KAPPAmax": 50.0 },
//!   "OutputGraph": { "Vgs": [2.0, 3.0, 5.0], "Vds_max": 25.0 },
//!   "TransferGraph": { "Vds": 50.0, "Vgs_max": 10.0 },
//!   "TransferPoints": { "Vgs": [0.5, 0.6], "Vds": [50.0, 50.0], "Id": [1e-12, 1e-11] },
//!   "OutputPoints": { "Vgs": [5.0], "Vds": [10.0], "Id": [1e-4] }
//! }
//! ```
//!
//! Every model parameter and fit bound is optional. The graph and point
//! sections are required, and unknown keys are rejected.

use std::path::Path;

use anyhow::{Context, Result};
use mosfit_devices::{Level3Params, SeriesResistance};
use mosfit_solver::{FitBounds, FitParameter, MeasurementSet};
use serde::Deserialize;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "Parameters", default)]
    pub parameters: ParametersSection,
    #[serde(rename = "OutputGraph")]
    pub output_graph: OutputGraphSection,
    #[serde(rename = "TransferGraph")]
    pub transfer_graph: TransferGraphSection,
    #[serde(rename = "TransferPoints")]
    pub transfer_points: PointsSection,
    #[serde(rename = "OutputPoints")]
    pub output_points: PointsSection,
}

/// Model parameters, series resistances and fit bounds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametersSection {
    /// Run the extraction before generating curves.
    #[serde(default)]
    pub optimize: bool,

    #[serde(rename = "VT0")]
    pub vt0: Option<f64>,
    #[serde(rename = "NSUB")]
    pub nsub: Option<f64>,
    #[serde(rename = "NFS")]
    pub nfs: Option<f64>,
    #[serde(rename = "KP")]
    pub kp: Option<f64>,
    #[serde(rename = "U0")]
    pub u0: Option<f64>,
    #[serde(rename = "Weff")]
    pub weff: Option<f64>,
    #[serde(rename = "Leff")]
    pub leff: Option<f64>,
    #[serde(rename = "TOX")]
    pub tox: Option<f64>,
    #[serde(rename = "VMAX")]
    pub vmax: Option<f64>,
    #[serde(rename = "THETA")]
    pub theta: Option<f64>,
    #[serde(rename = "XJ")]
    pub xj: Option<f64>,
    #[serde(rename = "PHI")]
    pub phi: Option<f64>,
    #[serde(rename = "DELTA")]
    pub delta: Option<f64>,
    #[serde(rename = "GAMMA")]
    pub gamma: Option<f64>,
    #[serde(rename = "ETA")]
    pub eta: Option<f64>,
    #[serde(rename = "KAPPA")]
    pub kappa: Option<f64>,

    /// Drain series resistance (ohms).
    #[serde(rename = "Rd")]
    pub rd: Option<f64>,
    /// Source series resistance (ohms).
    #[serde(rename = "Rs")]
    pub rs: Option<f64>,

    #[serde(rename = "VT0min")]
    pub vt0_min: Option<f64>,
    #[serde(rename = "VT0max")]
    pub vt0_max: Option<f64>,
    #[serde(rename = "NFSmin")]
    pub nfs_min: Option<f64>,
    #[serde(rename = "NFSmax")]
    pub nfs_max: Option<f64>,
    #[serde(rename = "KPmin")]
    pub kp_min: Option<f64>,
    #[serde(rename = "KPmax")]
    pub kp_max: Option<f64>,
    #[serde(rename = "THETAmin")]
    pub theta_min: Option<f64>,
    #[serde(rename = "THETAmax")]
    pub theta_max: Option<f64>,
    #[serde(rename = "KAPPAmin")]
    pub kappa_min: Option<f64>,
    #[serde(rename = "KAPPAmax")]
    pub kappa_max: Option<f64>,
}

/// Output characteristic sweep: one Id(Vds) curve per gate voltage.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputGraphSection {
    #[serde(rename = "Vgs")]
    pub vgs: Vec<f64>,
    #[serde(rename = "Vds_max")]
    pub vds_max: f64,
}

/// Transfer characteristic sweep at a fixed drain voltage.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferGraphSection {
    #[serde(rename = "Vds")]
    pub vds: f64,
    #[serde(rename = "Vgs_max")]
    pub vgs_max: f64,
}

/// Measured points as three parallel columns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointsSection {
    #[serde(rename = "Vgs")]
    pub vgs: Vec<f64>,
    #[serde(rename = "Vds")]
    pub vds: Vec<f64>,
    #[serde(rename = "Id")]
    pub id: Vec<f64>,
}

impl PointsSection {
    /// Validate the columns and build a measurement set.
    pub fn to_measurements(&self, name: &str) -> mosfit_solver::Result<MeasurementSet> {
        MeasurementSet::from_columns(name, &self.vgs, &self.vds, &self.id)
    }
}

impl ParametersSection {
    /// Model parameters with configured values over the program defaults.
    pub fn model_params(&self) -> Level3Params {
        let mut p = Level3Params {
            vt0: 1.0,
            nsub: 1e15,
            nfs: 1e9,
            ..Default::default()
        };
        let fields: [(Option<f64>, &mut f64); 16] = [
            (self.vt0, &mut p.vt0),
            (self.nsub, &mut p.nsub),
            (self.nfs, &mut p.nfs),
            (self.kp, &mut p.kp),
            (self.u0, &mut p.u0),
            (self.weff, &mut p.weff),
            (self.leff, &mut p.leff),
            (self.tox, &mut p.tox),
            (self.vmax, &mut p.vmax),
            (self.theta, &mut p.theta),
            (self.xj, &mut p.xj),
            (self.phi, &mut p.phi),
            (self.delta, &mut p.delta),
            (self.gamma, &mut p.gamma),
            (self.eta, &mut p.eta),
            (self.kappa, &mut p.kappa),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        p
    }

    pub fn resistance(&self) -> SeriesResistance {
        SeriesResistance::new(self.rd.unwrap_or(0.0), self.rs.unwrap_or(0.0))
    }

    /// Fit bounds with configured limits over the defaults.
    pub fn fit_bounds(&self) -> mosfit_solver::Result<FitBounds> {
        let overrides = [
            (FitParameter::Vt0, self.vt0_min, self.vt0_max),
            (FitParameter::Nfs, self.nfs_min, self.nfs_max),
            (FitParameter::Kp, self.kp_min, self.kp_max),
            (FitParameter::Theta, self.theta_min, self.theta_max),
            (FitParameter::Kappa, self.kappa_min, self.kappa_max),
        ];
        let mut bounds = FitBounds::default();
        for (param, min, max) in overrides {
            let (lo, hi) = bounds.get(param);
            bounds.set(param, min.unwrap_or(lo), max.unwrap_or(hi))?;
        }
        Ok(bounds)
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "OutputGraph": { "Vgs": [2.0, 3.0], "Vds_max": 25.0 },
        "TransferGraph": { "Vds": 50.0, "Vgs_max": 10.0 },
        "TransferPoints": { "Vgs": [], "Vds": [], "Id": [] },
        "OutputPoints": { "Vgs": [], "Vds": [], "Id": [] }
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert!(!config.parameters.optimize);
        let p = config.parameters.model_params();
        assert_eq!(p.vt0, 1.0);
        assert_eq!(p.nsub, 1e15);
        assert_eq!(p.nfs, 1e9);
        assert_eq!(p.u0, Level3Params::default().u0);
        assert!(config.parameters.resistance().is_zero());
        assert_eq!(config.parameters.fit_bounds().unwrap(), FitBounds::default());
        assert_eq!(config.output_graph.vgs, vec![2.0, 3.0]);
    }

    #[test]
    fn test_parameter_overrides() {
        let text = r#"{
            "Parameters": { "optimize": true, "KP": 2e-5, "Leff": 2e-6, "Rd": 15.0, "KAPPAmax": 10.0 },
            "OutputGraph": { "Vgs": [5.0], "Vds_max": 10.0 },
            "TransferGraph": { "Vds": 5.0, "Vgs_max": 5.0 },
            "TransferPoints": { "Vgs": [0.5], "Vds": [5.0], "Id": [1e-12] },
            "OutputPoints": { "Vgs": [5.0], "Vds": [5.0], "Id": [1e-4] }
        }"#;
        let config = Config::from_json(text).unwrap();
        assert!(config.parameters.optimize);
        let p = config.parameters.model_params();
        assert_eq!(p.kp, 2e-5);
        assert_eq!(p.leff, 2e-6);
        assert_eq!(config.parameters.resistance(), SeriesResistance::new(15.0, 0.0));
        let bounds = config.parameters.fit_bounds().unwrap();
        assert_eq!(bounds.get(FitParameter::Kappa), (0.0, 10.0));
        assert_eq!(config.transfer_points.to_measurements("TransferPoints").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let text = MINIMAL.replacen("\"OutputGraph\"", "\"Bogus\": 1, \"OutputGraph\"", 1);
        assert!(Config::from_json(&text).is_err());
    }

    #[test]
    fn test_missing_graph_section_rejected() {
        let text = r#"{
            "TransferGraph": { "Vds": 50.0, "Vgs_max": 10.0 },
            "TransferPoints": { "Vgs": [], "Vds": [], "Id": [] },
            "OutputPoints": { "Vgs": [], "Vds": [], "Id": [] }
        }"#;
        assert!(Config::from_json(text).is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let section = ParametersSection {
            vt0_min: Some(5.0),
            vt0_max: Some(1.0),
            ..Default::default()
        };
        assert!(section.fit_bounds().is_err());
    }

    #[test]
    fn test_mismatched_points_rejected() {
        let points = PointsSection {
            vgs: vec![1.0, 2.0, 3.0],
            vds: vec![5.0, 5.0, 5.0],
            id: vec![1e-6, 2e-6],
        };
        assert!(points.to_measurements("OutputPoints").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.transfer_graph.vds, 50.0);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json"));
    }
}

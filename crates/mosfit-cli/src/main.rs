//! mosfit CLI: LEVEL=3 MOSFET parameter extraction.
//!
//! Reads a JSON configuration, optionally fits VT0, NFS, KP, THETA and KAPPA
//! to the measured points, prints the parameters and writes the output and
//! transfer characteristics of the resulting model as CSV.

mod config;
mod curves;
mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use mosfit_devices::TerminalResistanceSolver;
use mosfit_solver::ParameterExtractor;

use crate::config::Config;
use crate::curves::{SWEEP_STEPS, output_curves, transfer_curve};
use crate::output::{write_measurements_csv, write_output_csv, write_report, write_transfer_csv};

/// LEVEL=3 MOSFET parameter extraction and curve generation
#[derive(Parser)]
#[command(name = "mosfit")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(default_value = "default.json")]
    config: PathBuf,

    /// Directory for the generated CSV files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    log::info!("Open config file: {}", cli.config.display());
    let config = Config::load(&cli.config)?;

    let params = &config.parameters;
    let mut model = params
        .model_params()
        .commit()
        .context("Invalid model parameters")?;
    let resistance = params.resistance();

    let subthreshold = config
        .transfer_points
        .to_measurements("TransferPoints")?;
    let on_region = config.output_points.to_measurements("OutputPoints")?;

    let mut fit = None;
    if params.optimize {
        let bounds = params.fit_bounds()?;
        let mut extractor =
            ParameterExtractor::new(model, subthreshold.clone(), on_region.clone())
                .with_resistance(resistance)
                .with_bounds(bounds);
        extractor.run();
        fit = extractor.report().cloned();
        model = extractor.into_model();
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, model.params(), fit.as_ref())?;
    out.flush()?;

    let device = TerminalResistanceSolver::new(&model, resistance);
    let output = output_curves(
        &device,
        &config.output_graph.vgs,
        config.output_graph.vds_max,
        SWEEP_STEPS,
    );
    let transfer = transfer_curve(
        &device,
        config.transfer_graph.vds,
        config.transfer_graph.vgs_max,
        SWEEP_STEPS,
    );

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;
    write_csv(&cli.output_dir.join("output_curves.csv"), |w| {
        write_output_csv(w, &output)
    })?;
    write_csv(&cli.output_dir.join("transfer_curve.csv"), |w| {
        write_transfer_csv(w, &transfer)
    })?;
    write_csv(&cli.output_dir.join("measured_points.csv"), |w| {
        write_measurements_csv(w, &[&subthreshold, &on_region])
    })?;

    Ok(())
}

fn write_csv(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "Parameters": { "optimize": true, "KP": 2.5e-5, "THETA": 0.15, "KAPPA": 0.3 },
        "OutputGraph": { "Vgs": [2.0, 4.0], "Vds_max": 10.0 },
        "TransferGraph": { "Vds": 5.0, "Vgs_max": 5.0 },
        "TransferPoints": {
            "Vgs": [0.6, 0.8, 1.0],
            "Vds": [5.0, 5.0, 5.0],
            "Id": [1e-13, 5e-12, 3e-10]
        },
        "OutputPoints": {
            "Vgs": [2.0, 3.0, 4.0, 5.0, 5.0],
            "Vds": [5.0, 5.0, 5.0, 1.0, 10.0],
            "Id": [8e-6, 3e-5, 6e-5, 4e-5, 1e-4]
        }
    }"#;

    #[test]
    fn test_run_writes_report_inputs_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("device.json");
        std::fs::write(&config_path, CONFIG).unwrap();
        let out_dir = dir.path().join("out");

        let cli = Cli {
            config: config_path,
            output_dir: out_dir.clone(),
        };
        run(&cli).unwrap();

        let output = std::fs::read_to_string(out_dir.join("output_curves.csv")).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("Vds,Id(Vgs=2),Id(Vgs=4)"));
        assert_eq!(lines.count(), SWEEP_STEPS + 1);

        let transfer = std::fs::read_to_string(out_dir.join("transfer_curve.csv")).unwrap();
        assert_eq!(transfer.lines().next(), Some("Vgs,Id(Vds=5)"));
        assert_eq!(transfer.lines().count(), SWEEP_STEPS + 2);

        let measured = std::fs::read_to_string(out_dir.join("measured_points.csv")).unwrap();
        assert_eq!(measured.lines().count(), 1 + 3 + 5);
    }

    #[test]
    fn test_run_rejects_mismatched_points() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.json");
        let bad = CONFIG.replace("\"Id\": [1e-13, 5e-12, 3e-10]", "\"Id\": [1e-13, 5e-12]");
        std::fs::write(&config_path, bad).unwrap();

        let cli = Cli {
            config: config_path,
            output_dir: dir.path().join("out"),
        };
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("TransferPoints"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: dir.path().join("nope.json"),
            output_dir: dir.path().to_path_buf(),
        };
        assert!(run(&cli).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["mosfit"]);
        assert_eq!(cli.config, PathBuf::from("default.json"));
        assert_eq!(cli.output_dir, PathBuf::from("."));
    }
}

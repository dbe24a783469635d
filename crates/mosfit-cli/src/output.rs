//! Parameter report and CSV output.

use std::io::Write;

use mosfit_devices::Level3Params;
use mosfit_solver::{FitReport, MeasurementSet};

use crate::curves::{OutputCurves, TransferCurve};

/// Format like C's `%E`: six decimals and a signed exponent of at least
/// two digits.
pub fn format_scientific(value: f64) -> String {
    let s = format!("{:.6E}", value);
    match s.split_once('E') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}E{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

/// Print the fit outcome (if any) followed by the extracted parameters.
pub fn write_report<W: Write>(
    writer: &mut W,
    params: &Level3Params,
    fit: Option<&FitReport>,
) -> std::io::Result<()> {
    if let Some(report) = fit {
        if !report.success() {
            writeln!(writer, "Not Successful")?;
        }
        writeln!(writer, "Residuals: {:e}", report.residuals)?;
    }
    writeln!(writer, "VT0={:?}", params.vt0)?;
    writeln!(writer, "NFS={}", format_scientific(params.nfs))?;
    writeln!(writer, "KP={:?}", params.kp)?;
    writeln!(writer, "THETA={:?}", params.theta)?;
    writeln!(writer, "KAPPA={:?}", params.kappa)?;
    Ok(())
}

/// Write output characteristics as CSV.
///
/// Format:
/// ```csv
/// Vds,Id(Vgs=2),Id(Vgs=3)
/// 0,0,0
/// 0.125,1.2e-6,2.5e-6
/// ```
pub fn write_output_csv<W: Write>(writer: &mut W, curves: &OutputCurves) -> std::io::Result<()> {
    write!(writer, "Vds")?;
    for (vgs, _) in &curves.curves {
        write!(writer, ",Id(Vgs={})", vgs)?;
    }
    writeln!(writer)?;

    for (i, vds) in curves.vds.iter().enumerate() {
        write!(writer, "{}", vds)?;
        for (_, id) in &curves.curves {
            write!(writer, ",{:e}", id[i])?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write a transfer characteristic as CSV.
///
/// Format:
/// ```csv
/// Vgs,Id(Vds=5)
/// 0,0
/// 0.025,1.3e-14
/// ```
pub fn write_transfer_csv<W: Write>(writer: &mut W, curve: &TransferCurve) -> std::io::Result<()> {
    writeln!(writer, "Vgs,Id(Vds={})", curve.vds)?;
    for (vgs, id) in curve.vgs.iter().zip(&curve.id) {
        writeln!(writer, "{},{:e}", vgs, id)?;
    }
    Ok(())
}

/// Write measured points as CSV, one row per point tagged with its set.
pub fn write_measurements_csv<W: Write>(
    writer: &mut W,
    sets: &[&MeasurementSet],
) -> std::io::Result<()> {
    writeln!(writer, "Set,Vgs,Vds,Id")?;
    for set in sets {
        for p in set.iter() {
            writeln!(writer, "{},{},{},{:e}", set.name(), p.vgs, p.vds, p.id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosfit_solver::{MeasurementPoint, TerminationReason};

    fn fit(status: TerminationReason) -> FitReport {
        FitReport {
            status,
            iterations: 10,
            evaluations: 70,
            initial_cost: 1e-8,
            final_cost: 5e-21,
            residuals: 1e-20,
            unconverged_solves: 0,
        }
    }

    fn params() -> Level3Params {
        Level3Params {
            vt0: 1.0,
            nfs: 1e9,
            kp: 2e-5,
            theta: 0.1,
            kappa: 0.2,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(1e9), "1.000000E+09");
        assert_eq!(format_scientific(2.5e-12), "2.500000E-12");
        assert_eq!(format_scientific(0.0), "0.000000E+00");
        assert_eq!(format_scientific(1.5e100), "1.500000E+100");
    }

    #[test]
    fn test_report_without_fit() {
        let mut out = Vec::new();
        write_report(&mut out, &params(), None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "VT0=1.0\nNFS=1.000000E+09\nKP=2e-5\nTHETA=0.1\nKAPPA=0.2\n"
        );
    }

    #[test]
    fn test_report_after_failed_fit() {
        let mut out = Vec::new();
        write_report(&mut out, &params(), Some(&fit(TerminationReason::MaxIterations))).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Not Successful");
        assert_eq!(lines[1], "Residuals: 1e-20");
        assert_eq!(lines[2], "VT0=1.0");
    }

    #[test]
    fn test_report_after_successful_fit() {
        let mut out = Vec::new();
        write_report(&mut out, &params(), Some(&fit(TerminationReason::Ftol))).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Not Successful"));
        assert!(text.starts_with("Residuals: "));
    }

    #[test]
    fn test_output_csv() {
        let curves = OutputCurves {
            vds: vec![0.0, 1.0],
            curves: vec![(2.0, vec![0.0, 1e-5]), (3.0, vec![0.0, 2e-5])],
        };
        let mut out = Vec::new();
        write_output_csv(&mut out, &curves).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Vds,Id(Vgs=2),Id(Vgs=3)\n0,0e0,0e0\n1,1e-5,2e-5\n");
    }

    #[test]
    fn test_transfer_csv() {
        let curve = TransferCurve {
            vds: 5.0,
            vgs: vec![0.0, 0.5],
            id: vec![0.0, 3e-12],
        };
        let mut out = Vec::new();
        write_transfer_csv(&mut out, &curve).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Vgs,Id(Vds=5)\n0,0e0\n0.5,3e-12\n");
    }

    #[test]
    fn test_measurements_csv() {
        let sub = MeasurementSet::from_points("TransferPoints", vec![MeasurementPoint::new(0.5, 5.0, 1e-12)]);
        let on = MeasurementSet::from_points("OutputPoints", vec![MeasurementPoint::new(5.0, 10.0, 1e-4)]);
        let mut out = Vec::new();
        write_measurements_csv(&mut out, &[&sub, &on]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Set,Vgs,Vds,Id\nTransferPoints,0.5,5,1e-12\nOutputPoints,5,10,1e-4\n"
        );
    }
}

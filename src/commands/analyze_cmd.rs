use std::process::ExitCode;

use tracing::warn;

use crate::commands::base_commands::Commands;
use crate::commands::report_format::{format_analysis_summary, write_report};
use crate::services::analysis::{AnalysisError, AnalysisSession};
use crate::services::analysis_config::AnalysisConfig;
use crate::services::histogram::write_histogram_png;
use crate::services::simulation_types::ENERGY_UNITS;

/// Exit code for rejected input, as opposed to I/O failures.
pub const ANALYSIS_FAILED: u8 = 2;

pub fn analyze_command(cmd: Commands) -> ExitCode {
    let Commands::Analyze {
        telemetry,
        meter,
        output,
        config,
        iterations,
        rated_capacity_kw,
        seed,
    } = cmd
    else {
        return ExitCode::FAILURE;
    };

    let mut analysis_config = match config {
        Some(path) => match AnalysisConfig::from_yaml_file(&path) {
            Ok(config) => config,
            Err(e) => return report_failure(&output, AnalysisError::from(e)),
        },
        None => AnalysisConfig::default(),
    };
    if let Some(iterations) = iterations {
        analysis_config.iterations = iterations;
    }
    if let Some(rated) = rated_capacity_kw {
        analysis_config.rated_capacity_kw = rated;
    }
    if seed.is_some() {
        analysis_config.seed = seed;
    }

    let telemetry_bytes = match std::fs::read(&telemetry) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read telemetry file {telemetry}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let meter_bytes = match std::fs::read(&meter) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read meter file {meter}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = AnalysisSession::new();
    let report = match session.analyze(&telemetry_bytes, &meter_bytes, &analysis_config) {
        Ok(report) => report,
        Err(e) => return report_failure(&output, e),
    };

    let histogram_path = format!("{output}.png");
    let histogram_written =
        match write_histogram_png(&histogram_path, &report.aep.histogram, &format!("AEP [{ENERGY_UNITS}]")) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "histogram png not written");
                false
            }
        };

    if let Err(e) = write_report(&output, report.as_ref()) {
        eprintln!("Failed to write analysis report: {e}");
        return ExitCode::FAILURE;
    }

    println!("{}", format_analysis_summary(&report));
    println!();
    println!("Analysis report written to {output}");
    if histogram_written {
        println!("AEP histogram written to {histogram_path}");
    }
    ExitCode::SUCCESS
}

/// Prints the error and stores its structured form at `output`.
pub fn report_failure(output: &str, error: AnalysisError) -> ExitCode {
    eprintln!("Analysis failed: {error}");
    if let Err(e) = write_report(output, &error.report()) {
        eprintln!("Failed to write error report: {e}");
    }
    ExitCode::from(ANALYSIS_FAILED)
}

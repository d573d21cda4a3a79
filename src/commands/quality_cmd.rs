use std::process::ExitCode;

use crate::commands::analyze_cmd::{report_failure, ANALYSIS_FAILED};
use crate::commands::base_commands::Commands;
use crate::commands::report_format::{format_quality_summary, write_report};
use crate::services::analysis::AnalysisSession;

pub fn quality_command(cmd: Commands) -> ExitCode {
    let Commands::Quality {
        telemetry,
        meter,
        output,
    } = cmd
    else {
        return ExitCode::FAILURE;
    };

    let (telemetry_bytes, meter_bytes) = match (std::fs::read(&telemetry), std::fs::read(&meter)) {
        (Ok(telemetry_bytes), Ok(meter_bytes)) => (telemetry_bytes, meter_bytes),
        (Err(e), _) => {
            eprintln!("Failed to read telemetry file {telemetry}: {e}");
            return ExitCode::FAILURE;
        }
        (_, Err(e)) => {
            eprintln!("Failed to read meter file {meter}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = match AnalysisSession::new().quality(&telemetry_bytes, &meter_bytes) {
        Ok(report) => report,
        Err(e) => {
            return match &output {
                Some(path) => report_failure(path, e),
                None => {
                    eprintln!("Quality scoring failed: {e}");
                    ExitCode::from(ANALYSIS_FAILED)
                }
            };
        }
    };

    println!("{}", format_quality_summary(&report));
    if let Some(path) = output {
        if let Err(e) = write_report(&path, &report) {
            eprintln!("Failed to write quality report: {e}");
            return ExitCode::FAILURE;
        }
        println!("Quality report written to {path}");
    }
    ExitCode::SUCCESS
}

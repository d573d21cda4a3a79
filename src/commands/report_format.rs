use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::domain::quality::{QualityReport, SeriesSummary};
use crate::services::analysis::AnalysisReport;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to serialize report as yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to serialize report as json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// JSON when the path ends in `.json`, YAML otherwise.
pub fn serialize_for_path<T: Serialize>(path: &str, value: &T) -> Result<String, ReportError> {
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_yaml::to_string(value)?)
    }
}

pub fn write_report<T: Serialize>(path: &str, value: &T) -> Result<(), ReportError> {
    let contents = serialize_for_path(path, value)?;
    std::fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_string(),
        source,
    })
}

pub fn format_analysis_summary(report: &AnalysisReport) -> String {
    let weibull = match &report.weibull {
        Some(fit) => format!("k={:.2}, c={:.2} m/s", fit.shape_k, fit.scale_c),
        None => "n/a".to_string(),
    };

    let mut lines = Vec::new();
    lines.push("AEP Report".to_string());
    lines.push(format!(
        "Window: {} to {} ({} days, {} day buffer)",
        report.window.common_start.date(),
        report.window.effective_end,
        report.window.total_duration_days,
        report.window.buffer_days
    ));
    lines.push(format!(
        "Iterations: {} ({} discarded)",
        report.aep.simulation.iterations, report.aep.simulation.failed_draws
    ));
    lines.push(format!("Seed: {}", report.seed));
    lines.push(format!("Data quality: {:.2}", report.quality.overall_score));
    lines.push(format!("Capacity factor: {:.1}%", report.capacity_factor.percent));
    lines.push(format!("Mean wind speed: {:.2} m/s", report.wind.mean));
    lines.push(format!("Weibull: {weibull}"));
    lines.push(String::new());
    lines.push("Exceedance | Energy".to_string());
    lines.push("-----------|-------".to_string());
    lines.push(format!("P50 | {:.1} {}", report.aep.p50, report.aep.units));
    lines.push(format!("P90 | {:.1} {}", report.aep.p90, report.aep.units));

    lines.join("\n")
}

pub fn format_quality_summary(report: &QualityReport) -> String {
    let mut lines = Vec::new();
    lines.push("Data Quality Report".to_string());
    lines.push("Series | Rows | Duplicates | Completeness | Frequency | Score".to_string());
    lines.push("-------|------|------------|--------------|-----------|------".to_string());
    lines.push(format_series_row(&report.scada));
    lines.push(format_series_row(&report.meter));
    lines.push(format!("Overall score: {:.2}", report.overall_score));
    lines.join("\n")
}

fn format_series_row(summary: &SeriesSummary) -> String {
    format!(
        "{} | {} | {} | {:.1}% | {} | {:.2}",
        summary.kind,
        summary.total_rows,
        summary.duplicate_count,
        summary.completeness_fraction * 100.0,
        summary.inferred_frequency,
        summary.score
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::SeriesKind;
    use std::collections::BTreeMap;

    fn summary(kind: SeriesKind, score: f64) -> SeriesSummary {
        SeriesSummary {
            kind,
            total_rows: 8_760,
            duplicate_count: 12,
            missing_values: BTreeMap::new(),
            negative_values: 0,
            start: None,
            end: None,
            coverage_days: 365.0,
            inferred_sampling_interval_seconds: Some(3_600),
            inferred_frequency: "1h".to_string(),
            timestamp_format: Some("iso_date_time".to_string()),
            completeness_fraction: 0.985,
            score,
        }
    }

    #[test]
    fn quality_summary_lists_both_series() {
        let report = QualityReport {
            scada: summary(SeriesKind::Telemetry, 0.97),
            meter: summary(SeriesKind::Meter, 0.5),
            overall_score: 0.782,
        };

        let output = format_quality_summary(&report);

        assert!(output.contains("Data Quality Report"));
        assert!(output.contains("telemetry | 8760 | 12 | 98.5% | 1h | 0.97"));
        assert!(output.contains("meter | 8760 | 12 | 98.5% | 1h | 0.50"));
        assert!(output.contains("Overall score: 0.78"));
    }

    #[test]
    fn json_extension_selects_json() {
        let value = BTreeMap::from([("p50", 1.5)]);

        let json = serialize_for_path("out/report.JSON", &value).unwrap();
        let yaml = serialize_for_path("out/report.yaml", &value).unwrap();

        assert!(json.contains("\"p50\": 1.5"));
        assert_eq!(yaml.trim(), "p50: 1.5");
    }
}

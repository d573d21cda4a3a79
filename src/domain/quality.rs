use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::records::SeriesKind;

/// Quality metrics for one raw series, computed before alignment.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub kind: SeriesKind,
    pub total_rows: usize,
    pub duplicate_count: usize,
    pub missing_values: BTreeMap<String, usize>,
    pub negative_values: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub coverage_days: f64,
    pub inferred_sampling_interval_seconds: Option<i64>,
    pub inferred_frequency: String,
    pub timestamp_format: Option<String>,
    pub completeness_fraction: f64,
    pub score: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub scada: SeriesSummary,
    pub meter: SeriesSummary,
    pub overall_score: f64,
}

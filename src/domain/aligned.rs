use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::domain::records::{MeterRecord, TelemetryRecord};

/// Both series trimmed to the common analysis window.
///
/// `effective_end = common_end - buffer_days` and
/// `total_duration_days = inclusive_day_span(common_start, effective_end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDataset {
    pub telemetry: Vec<TelemetryRecord>,
    pub meter: Vec<MeterRecord>,
    pub common_start: NaiveDateTime,
    pub common_end: NaiveDateTime,
    pub effective_end: NaiveDate,
    pub total_duration_days: i64,
    pub buffer_days: i64,
}

impl AlignedDataset {
    pub fn start_date(&self) -> NaiveDate {
        self.common_start.date()
    }

    pub fn duration_hours(&self) -> f64 {
        self.total_duration_days as f64 * 24.0
    }

    pub fn window(&self) -> AnalysisWindow {
        AnalysisWindow {
            common_start: self.common_start,
            common_end: self.common_end,
            effective_end: self.effective_end,
            total_duration_days: self.total_duration_days,
            buffer_days: self.buffer_days,
            telemetry_rows: self.telemetry.len(),
            meter_rows: self.meter.len(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AnalysisWindow {
    pub common_start: NaiveDateTime,
    pub common_end: NaiveDateTime,
    pub effective_end: NaiveDate,
    pub total_duration_days: i64,
    pub buffer_days: i64,
    pub telemetry_rows: usize,
    pub meter_rows: usize,
}

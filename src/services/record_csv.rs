use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::records::{MeterRecord, SeriesKind, SeriesRecord, TelemetryRecord, TIME_COLUMN};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{series} file is missing required column '{column}'")]
    MissingColumn { series: SeriesKind, column: String },
    #[error("{series} column '{column}' has no parseable values")]
    UnparseableColumn { series: SeriesKind, column: String },
    #[error("failed to read {series} csv: {source}")]
    Csv {
        series: SeriesKind,
        source: csv::Error,
    },
}

impl SchemaError {
    pub fn series(&self) -> SeriesKind {
        match self {
            SchemaError::MissingColumn { series, .. }
            | SchemaError::UnparseableColumn { series, .. }
            | SchemaError::Csv { series, .. } => *series,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            SchemaError::MissingColumn { column, .. }
            | SchemaError::UnparseableColumn { column, .. } => Some(column),
            SchemaError::Csv { .. } => None,
        }
    }
}

/// Accepted timestamp layouts in priority order. One layout is selected per
/// file and applied to every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    Rfc3339,
    IsoDateTime,
    IsoDateTimeMinutes,
    IsoDate,
    UsDateTime,
    UsDateTimeMinutes,
    EuropeanDateTime,
    EuropeanDateTimeMinutes,
}

impl TimestampFormat {
    pub const PRIORITY: [TimestampFormat; 8] = [
        TimestampFormat::Rfc3339,
        TimestampFormat::IsoDateTime,
        TimestampFormat::IsoDateTimeMinutes,
        TimestampFormat::IsoDate,
        TimestampFormat::UsDateTime,
        TimestampFormat::UsDateTimeMinutes,
        TimestampFormat::EuropeanDateTime,
        TimestampFormat::EuropeanDateTimeMinutes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimestampFormat::Rfc3339 => "rfc3339",
            TimestampFormat::IsoDateTime => "iso_date_time",
            TimestampFormat::IsoDateTimeMinutes => "iso_date_time_minutes",
            TimestampFormat::IsoDate => "iso_date",
            TimestampFormat::UsDateTime => "us_date_time",
            TimestampFormat::UsDateTimeMinutes => "us_date_time_minutes",
            TimestampFormat::EuropeanDateTime => "european_date_time",
            TimestampFormat::EuropeanDateTimeMinutes => "european_date_time_minutes",
        }
    }

    /// Timestamps carrying an offset are normalised to UTC.
    pub fn parse(self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        match self {
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|ts| ts.naive_utc()),
            TimestampFormat::IsoDateTime => parse_first(
                value,
                &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"],
            ),
            TimestampFormat::IsoDateTimeMinutes => {
                parse_first(value, &["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"])
            }
            TimestampFormat::IsoDate => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0)),
            TimestampFormat::UsDateTime => parse_first(value, &["%m/%d/%Y %H:%M:%S"]),
            TimestampFormat::UsDateTimeMinutes => parse_first(value, &["%m/%d/%Y %H:%M"]),
            TimestampFormat::EuropeanDateTime => parse_first(value, &["%d.%m.%Y %H:%M:%S"]),
            TimestampFormat::EuropeanDateTimeMinutes => parse_first(value, &["%d.%m.%Y %H:%M"]),
        }
    }
}

fn parse_first(value: &str, patterns: &[&str]) -> Option<NaiveDateTime> {
    patterns
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
}

/// Cells inspected when selecting the file's timestamp format.
const FORMAT_PROBE_ROWS: usize = 100;

/// Typed records of one input file, sorted ascending by timestamp.
#[derive(Debug, Clone)]
pub struct ValidatedSeries<R> {
    pub records: Vec<R>,
    pub total_rows: usize,
    pub missing_values: BTreeMap<String, usize>,
    pub timestamp_format: Option<TimestampFormat>,
}

impl<R: SeriesRecord> ValidatedSeries<R> {
    pub fn kind(&self) -> SeriesKind {
        R::KIND
    }

    pub fn dropped_rows(&self) -> usize {
        self.missing_values.get(TIME_COLUMN).copied().unwrap_or(0)
    }
}

pub fn parse_telemetry_csv(bytes: &[u8]) -> Result<ValidatedSeries<TelemetryRecord>, SchemaError> {
    parse_series_csv(bytes)
}

pub fn parse_meter_csv(bytes: &[u8]) -> Result<ValidatedSeries<MeterRecord>, SchemaError> {
    parse_series_csv(bytes)
}

/// Parses a telemetry or meter csv into typed records.
///
/// # Errors
/// - A required column is absent from the header.
/// - Every value of the time column or of a required numeric column fails to
///   parse. Individual bad cells are only counted as missing values.
pub fn parse_series_csv<R: SeriesRecord>(bytes: &[u8]) -> Result<ValidatedSeries<R>, SchemaError> {
    let csv_error = |source: csv::Error| SchemaError::Csv {
        series: R::KIND,
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let header_map: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name, idx))
        .collect();

    let column_index = |column: &str| {
        header_map
            .get(column)
            .copied()
            .ok_or_else(|| SchemaError::MissingColumn {
                series: R::KIND,
                column: column.to_string(),
            })
    };
    let time_idx = column_index(TIME_COLUMN)?;
    let value_idx = R::VALUE_COLUMNS
        .iter()
        .map(|column| column_index(*column))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)?;

    let mut missing_values: BTreeMap<String, usize> = std::iter::once(TIME_COLUMN)
        .chain(R::VALUE_COLUMNS.iter().copied())
        .map(|column| (column.to_string(), 0))
        .collect();

    if rows.is_empty() {
        return Ok(ValidatedSeries {
            records: Vec::new(),
            total_rows: 0,
            missing_values,
            timestamp_format: None,
        });
    }

    let time_cells: Vec<&str> = rows
        .iter()
        .map(|row| row.get(time_idx).unwrap_or(""))
        .collect();
    let timestamp_format = select_timestamp_format(&time_cells).ok_or_else(|| {
        SchemaError::UnparseableColumn {
            series: R::KIND,
            column: TIME_COLUMN.to_string(),
        }
    })?;
    debug!(series = %R::KIND, format = ?timestamp_format, "selected timestamp format");

    let mut parsed_counts = vec![0usize; value_idx.len()];
    let mut records = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(value_idx.len());
    for (row, time_cell) in rows.iter().zip(&time_cells) {
        values.clear();
        for (slot, (column, idx)) in R::VALUE_COLUMNS.iter().zip(&value_idx).enumerate() {
            let value = row.get(*idx).and_then(parse_number);
            if value.is_some() {
                parsed_counts[slot] += 1;
            } else if let Some(count) = missing_values.get_mut(*column) {
                *count += 1;
            }
            values.push(value);
        }

        match timestamp_format.parse(time_cell) {
            Some(timestamp) => records.push(R::from_values(timestamp, &values)),
            None => {
                if let Some(count) = missing_values.get_mut(TIME_COLUMN) {
                    *count += 1;
                }
            }
        }
    }

    if let Some(slot) = parsed_counts.iter().position(|count| *count == 0) {
        return Err(SchemaError::UnparseableColumn {
            series: R::KIND,
            column: R::VALUE_COLUMNS[slot].to_string(),
        });
    }

    let dropped = rows.len() - records.len();
    if dropped > 0 {
        warn!(series = %R::KIND, dropped, "dropped rows with unparseable timestamps");
    }
    let negative = records.iter().filter(|r| r.has_negative_output()).count();
    if negative > 0 {
        warn!(series = %R::KIND, negative, "negative power/energy values retained");
    }

    records.sort_by_key(|record| record.timestamp());

    Ok(ValidatedSeries {
        records,
        total_rows: rows.len(),
        missing_values,
        timestamp_format: Some(timestamp_format),
    })
}

/// Picks the first format in priority order that parses a majority of the
/// probed cells, falling back to the format that parses the most.
fn select_timestamp_format(cells: &[&str]) -> Option<TimestampFormat> {
    let probe: Vec<&str> = cells
        .iter()
        .copied()
        .filter(|cell| !cell.trim().is_empty())
        .take(FORMAT_PROBE_ROWS)
        .collect();
    if probe.is_empty() {
        return None;
    }

    let mut best: Option<(TimestampFormat, usize)> = None;
    for format in TimestampFormat::PRIORITY {
        let parsed = probe.iter().filter(|cell| format.parse(cell).is_some()).count();
        if parsed * 2 > probe.len() {
            return Some(format);
        }
        if parsed > best.map_or(0, |(_, count)| count) {
            best = Some((format, parsed));
        }
    }
    best.map(|(format, _)| format)
}

fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}

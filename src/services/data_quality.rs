use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use tracing::info;

use crate::domain::quality::{QualityReport, SeriesSummary};
use crate::domain::records::{MeterRecord, SeriesRecord, TelemetryRecord};
use crate::services::record_csv::ValidatedSeries;

/// Weight of the telemetry series in the overall score; the meter series
/// takes the remainder.
pub const TELEMETRY_WEIGHT: f64 = 0.6;
pub const METER_WEIGHT: f64 = 1.0 - TELEMETRY_WEIGHT;

/// Scores both raw series. Never fails: an empty series scores 0.
pub fn generate_quality_report(
    telemetry: &ValidatedSeries<TelemetryRecord>,
    meter: &ValidatedSeries<MeterRecord>,
) -> QualityReport {
    let scada = summarize_series(telemetry);
    let meter = summarize_series(meter);
    let overall_score =
        (scada.score * TELEMETRY_WEIGHT + meter.score * METER_WEIGHT).clamp(0.0, 1.0);

    info!(
        telemetry_score = scada.score,
        meter_score = meter.score,
        overall_score,
        "data quality summary generated"
    );

    QualityReport {
        scada,
        meter,
        overall_score,
    }
}

/// Computes the quality metrics of one series over its own coverage span.
pub fn summarize_series<R: SeriesRecord>(series: &ValidatedSeries<R>) -> SeriesSummary {
    let records = &series.records;
    let start = records.first().map(|r| r.timestamp());
    let end = records.last().map(|r| r.timestamp());

    let duplicate_count = count_duplicate_timestamps(records);
    let interval = infer_sampling_interval(records);
    let completeness_fraction = completeness_fraction(records, start, end, interval);
    let duplicate_rate = if records.is_empty() {
        0.0
    } else {
        duplicate_count as f64 / records.len() as f64
    };
    let score = (completeness_fraction * (1.0 - duplicate_rate)).clamp(0.0, 1.0);

    let coverage_days = match (start, end) {
        (Some(start), Some(end)) => (end - start).num_seconds() as f64 / 86_400.0,
        _ => 0.0,
    };

    SeriesSummary {
        kind: R::KIND,
        total_rows: series.total_rows,
        duplicate_count,
        missing_values: series.missing_values.clone(),
        negative_values: records.iter().filter(|r| r.has_negative_output()).count(),
        start,
        end,
        coverage_days,
        inferred_sampling_interval_seconds: interval,
        inferred_frequency: frequency_label(records.len(), interval),
        timestamp_format: series.timestamp_format.map(|format| format.name().to_string()),
        completeness_fraction,
        score,
    }
}

/// Rows whose timestamp equals that of an earlier row.
pub fn count_duplicate_timestamps<R: SeriesRecord>(records: &[R]) -> usize {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|record| !seen.insert(record.timestamp()))
        .count()
}

/// Most common positive gap between consecutive sorted timestamps, in
/// seconds. Ties go to the shorter gap.
pub fn infer_sampling_interval<R: SeriesRecord>(records: &[R]) -> Option<i64> {
    let mut gaps: BTreeMap<i64, usize> = BTreeMap::new();
    for pair in records.windows(2) {
        let gap = (pair[1].timestamp() - pair[0].timestamp()).num_seconds();
        if gap > 0 {
            *gaps.entry(gap).or_insert(0) += 1;
        }
    }
    gaps.into_iter()
        .fold(None, |best: Option<(i64, usize)>, (gap, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((gap, count)),
        })
        .map(|(gap, _)| gap)
}

fn completeness_fraction<R: SeriesRecord>(
    records: &[R],
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    interval: Option<i64>,
) -> f64 {
    let observed: HashSet<NaiveDateTime> = records
        .iter()
        .filter(|record| record.has_critical_values())
        .map(|record| record.timestamp())
        .collect();
    if observed.is_empty() {
        return 0.0;
    }

    let expected = match (start, end, interval) {
        (Some(start), Some(end), Some(interval)) => (end - start).num_seconds() / interval + 1,
        _ => 1,
    };
    (observed.len() as f64 / expected as f64).clamp(0.0, 1.0)
}

fn frequency_label(record_count: usize, interval: Option<i64>) -> String {
    let Some(seconds) = interval else {
        return match record_count {
            0 => "empty".to_string(),
            1 => "single_record".to_string(),
            _ => "unknown".to_string(),
        };
    };

    if seconds < 3_600 {
        if seconds % 60 == 0 {
            format!("{}min", seconds / 60)
        } else {
            format!("{seconds}s")
        }
    } else if seconds < 86_400 {
        if seconds % 3_600 == 0 {
            format!("{}h", seconds / 3_600)
        } else {
            format!("{}min", seconds / 60)
        }
    } else if seconds % 86_400 == 0 {
        format!("{}d", seconds / 86_400)
    } else {
        format!("{}h", seconds / 3_600)
    }
}

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::aligned::AlignedDataset;
use crate::domain::calendar::{inclusive_day_span, BufferTier, MINIMUM_ANALYSIS_DAYS};
use crate::domain::records::{MeterRecord, SeriesKind, TelemetryRecord};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error(
        "aligned window covers {total_duration_days} days after a {buffer_days}-day buffer \
         (raw overlap {raw_span_days} days); at least 365 days are required"
    )]
    InsufficientData {
        total_duration_days: i64,
        raw_span_days: i64,
        buffer_days: i64,
    },
    #[error("{0} series has no records")]
    EmptySeries(SeriesKind),
    #[error("telemetry and meter series do not overlap ({start} is after {end})")]
    InvertedWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("{0} series has no records inside the aligned window")]
    EmptyOverlap(SeriesKind),
    #[error("{series} field '{field}' has no values inside the aligned window")]
    NoValidValues {
        series: SeriesKind,
        field: &'static str,
    },
}

/// Intersects the two sorted series and trims them to an analysis window of
/// at least [`MINIMUM_ANALYSIS_DAYS`] whole days.
///
/// # Errors
/// - Either series is empty or the overlap is inverted.
/// - The buffered window is shorter than the minimum.
/// - A series, or one of its critical fields, has nothing left inside the window.
pub fn align_series(
    telemetry: &[TelemetryRecord],
    meter: &[MeterRecord],
) -> Result<AlignedDataset, AlignmentError> {
    let (telemetry_first, telemetry_last) = bounds(telemetry.iter().map(|r| r.timestamp))
        .ok_or(AlignmentError::EmptySeries(SeriesKind::Telemetry))?;
    let (meter_first, meter_last) = bounds(meter.iter().map(|r| r.timestamp))
        .ok_or(AlignmentError::EmptySeries(SeriesKind::Meter))?;

    let common_start = telemetry_first.max(meter_first);
    let common_end = telemetry_last.min(meter_last);
    if common_end < common_start {
        return Err(AlignmentError::InvertedWindow {
            start: common_start,
            end: common_end,
        });
    }

    let window = buffered_window(common_start.date(), common_end.date())?;
    debug!(
        raw_span_days = window.raw_span_days,
        buffer_days = window.buffer_days,
        total_duration_days = window.total_duration_days,
        "selected alignment buffer"
    );

    let in_window = |timestamp: NaiveDateTime| {
        timestamp >= common_start && timestamp.date() <= window.effective_end
    };
    let mut telemetry: Vec<TelemetryRecord> = telemetry
        .iter()
        .copied()
        .filter(|r| in_window(r.timestamp))
        .collect();
    let mut meter: Vec<MeterRecord> = meter
        .iter()
        .copied()
        .filter(|r| in_window(r.timestamp))
        .collect();
    // Day blocks are built with a forward cursor; callers may pass any order.
    telemetry.sort_by_key(|r| r.timestamp);
    meter.sort_by_key(|r| r.timestamp);

    if telemetry.is_empty() {
        return Err(AlignmentError::EmptyOverlap(SeriesKind::Telemetry));
    }
    if meter.is_empty() {
        return Err(AlignmentError::EmptyOverlap(SeriesKind::Meter));
    }
    if telemetry.iter().all(|r| r.power_kw.is_none()) {
        return Err(AlignmentError::NoValidValues {
            series: SeriesKind::Telemetry,
            field: "power_kw",
        });
    }
    if telemetry.iter().all(|r| r.wind_speed_ms.is_none()) {
        return Err(AlignmentError::NoValidValues {
            series: SeriesKind::Telemetry,
            field: "wind_speed_ms",
        });
    }
    if meter.iter().all(|r| r.energy_kwh.is_none()) {
        return Err(AlignmentError::NoValidValues {
            series: SeriesKind::Meter,
            field: "energy_kwh",
        });
    }

    info!(
        common_start = %common_start,
        effective_end = %window.effective_end,
        total_duration_days = window.total_duration_days,
        telemetry_rows = telemetry.len(),
        meter_rows = meter.len(),
        "series aligned"
    );

    Ok(AlignedDataset {
        telemetry,
        meter,
        common_start,
        common_end,
        effective_end: window.effective_end,
        total_duration_days: window.total_duration_days,
        buffer_days: window.buffer_days,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferedWindow {
    pub raw_span_days: i64,
    pub buffer_days: i64,
    pub effective_end: NaiveDate,
    pub total_duration_days: i64,
}

/// Applies the buffer policy to a day range and enforces the minimum length.
pub fn buffered_window(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BufferedWindow, AlignmentError> {
    let raw_span_days = inclusive_day_span(start, end);
    let buffer_days = BufferTier::for_span(raw_span_days).days();
    let effective_end = end - Duration::days(buffer_days);
    let total_duration_days = inclusive_day_span(start, effective_end);

    if total_duration_days < MINIMUM_ANALYSIS_DAYS {
        return Err(AlignmentError::InsufficientData {
            total_duration_days,
            raw_span_days,
            buffer_days,
        });
    }

    Ok(BufferedWindow {
        raw_span_days,
        buffer_days,
        effective_end,
        total_duration_days,
    })
}

fn bounds(mut timestamps: impl Iterator<Item = NaiveDateTime>) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = timestamps.next()?;
    Some(timestamps.fold((first, first), |(min, max), ts| (min.min(ts), max.max(ts))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{daily_meter, daily_telemetry, on_date, on_datetime};

    #[test]
    fn exactly_one_calendar_year_aligns_without_buffer() {
        let telemetry = daily_telemetry(on_date(2023, 1, 1), 365);
        let meter = daily_meter(on_date(2023, 1, 1), 365);

        let aligned = align_series(&telemetry, &meter).unwrap();

        assert_eq!(aligned.total_duration_days, 365);
        assert_eq!(aligned.buffer_days, 0);
        assert_eq!(aligned.effective_end, on_date(2023, 12, 31));
        assert_eq!(aligned.telemetry.len(), 365);
    }

    #[test]
    fn one_day_short_of_a_year_is_insufficient() {
        let telemetry = daily_telemetry(on_date(2023, 1, 1), 364);
        let meter = daily_meter(on_date(2023, 1, 1), 364);

        let err = align_series(&telemetry, &meter).unwrap_err();
        assert_eq!(
            err,
            AlignmentError::InsufficientData {
                total_duration_days: 364,
                raw_span_days: 364,
                buffer_days: 0,
            }
        );
    }

    #[test]
    fn buffer_transitions_at_each_boundary() {
        let test_cases = vec![(370, 0, 370), (371, 1, 370), (385, 1, 384), (386, 5, 381), (400, 5, 395)];

        for (span, expected_buffer, expected_total) in test_cases {
            let telemetry = daily_telemetry(on_date(2022, 1, 1), span);
            let meter = daily_meter(on_date(2022, 1, 1), span);

            let aligned = align_series(&telemetry, &meter).unwrap();
            assert_eq!(aligned.buffer_days, expected_buffer, "span {span}");
            assert_eq!(aligned.total_duration_days, expected_total, "span {span}");
            assert_eq!(aligned.telemetry.len() as i64, expected_total, "span {span}");
        }
    }

    #[test]
    fn window_is_the_intersection_of_both_series() {
        let telemetry = daily_telemetry(on_date(2022, 1, 1), 420);
        let meter = daily_meter(on_date(2022, 2, 1), 370);

        let aligned = align_series(&telemetry, &meter).unwrap();

        assert_eq!(aligned.common_start.date(), on_date(2022, 2, 1));
        assert_eq!(aligned.buffer_days, 0);
        assert_eq!(aligned.total_duration_days, 370);
        assert!(aligned.telemetry.iter().all(|r| r.timestamp >= aligned.common_start));
        assert_eq!(aligned.telemetry.len(), aligned.meter.len());
    }

    #[test]
    fn unsorted_input_aligns_like_sorted_input() {
        let telemetry = daily_telemetry(on_date(2022, 1, 1), 400);
        let meter = daily_meter(on_date(2022, 1, 1), 400);
        let mut reversed_telemetry = telemetry.clone();
        reversed_telemetry.reverse();
        let mut reversed_meter = meter.clone();
        reversed_meter.reverse();

        let sorted = align_series(&telemetry, &meter).unwrap();
        let reversed = align_series(&reversed_telemetry, &reversed_meter).unwrap();

        assert_eq!(reversed, sorted);
        assert!(reversed.meter.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn disjoint_series_are_an_inverted_window() {
        let telemetry = daily_telemetry(on_date(2020, 1, 1), 400);
        let meter = daily_meter(on_date(2022, 1, 1), 400);

        let err = align_series(&telemetry, &meter).unwrap_err();
        assert!(matches!(err, AlignmentError::InvertedWindow { .. }));
    }

    #[test]
    fn empty_series_is_rejected() {
        let telemetry = daily_telemetry(on_date(2022, 1, 1), 400);

        let err = align_series(&telemetry, &[]).unwrap_err();
        assert_eq!(err, AlignmentError::EmptySeries(SeriesKind::Meter));
    }

    #[test]
    fn all_null_energy_inside_the_window_is_rejected() {
        let telemetry = daily_telemetry(on_date(2022, 1, 1), 400);
        let meter: Vec<MeterRecord> = daily_meter(on_date(2022, 1, 1), 400)
            .into_iter()
            .map(|r| MeterRecord {
                energy_kwh: None,
                ..r
            })
            .collect();

        let err = align_series(&telemetry, &meter).unwrap_err();
        assert_eq!(
            err,
            AlignmentError::NoValidValues {
                series: SeriesKind::Meter,
                field: "energy_kwh",
            }
        );
    }

    #[test]
    fn partial_first_day_still_counts_as_a_calendar_day() {
        // Starts mid-afternoon; the first date is still counted in full.
        let mut telemetry = daily_telemetry(on_date(2023, 1, 2), 364);
        telemetry.insert(
            0,
            TelemetryRecord {
                timestamp: on_datetime(2023, 1, 1, 15, 0),
                power_kw: Some(10.0),
                wind_speed_ms: Some(5.0),
                wind_direction_deg: Some(90.0),
            },
        );
        let mut meter = daily_meter(on_date(2023, 1, 2), 364);
        meter.insert(
            0,
            MeterRecord {
                timestamp: on_datetime(2023, 1, 1, 15, 0),
                energy_kwh: Some(10.0),
            },
        );

        let aligned = align_series(&telemetry, &meter).unwrap();
        assert_eq!(aligned.total_duration_days, 365);
    }

    #[test]
    fn leap_year_window_counts_february_29() {
        let window = buffered_window(on_date(2024, 1, 1), on_date(2024, 12, 30)).unwrap();
        assert_eq!(window.total_duration_days, 365);

        let err = buffered_window(on_date(2024, 1, 1), on_date(2024, 12, 29)).unwrap_err();
        assert!(matches!(err, AlignmentError::InsufficientData { total_duration_days: 364, .. }));
    }
}

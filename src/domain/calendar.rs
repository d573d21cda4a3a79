use chrono::{Datelike, Duration, NaiveDate};

/// Shortest analysis window accepted, in whole calendar days.
pub const MINIMUM_ANALYSIS_DAYS: i64 = 365;

/// Number of calendar days from `start` to `end` with both endpoints counted.
///
/// Jan 1 to Dec 31 of a non-leap year is 365, a single day is 1, and an
/// inverted range is zero or negative.
pub fn inclusive_day_span(start: NaiveDate, end: NaiveDate) -> i64 {
    end.signed_duration_since(start).num_days() + 1
}

/// Days trimmed from the end of an overlap window to absorb partial-day
/// artifacts. Thresholds are inclusive on the upper bound of each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTier {
    None,
    Short,
    Long,
}

impl BufferTier {
    const SHORT_SPAN_LIMIT: i64 = 370;
    const LONG_SPAN_LIMIT: i64 = 385;

    pub fn for_span(raw_span_days: i64) -> Self {
        if raw_span_days <= Self::SHORT_SPAN_LIMIT {
            BufferTier::None
        } else if raw_span_days <= Self::LONG_SPAN_LIMIT {
            BufferTier::Short
        } else {
            BufferTier::Long
        }
    }

    pub fn days(self) -> i64 {
        match self {
            BufferTier::None => 0,
            BufferTier::Short => 1,
            BufferTier::Long => 5,
        }
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Iterates every calendar day in `[start, end]`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let count = inclusive_day_span(start, end).max(0);
    (0..count).map(move |offset| start + Duration::days(offset))
}

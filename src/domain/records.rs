use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TIME_COLUMN: &str = "time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Telemetry,
    Meter,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Telemetry => write!(f, "telemetry"),
            SeriesKind::Meter => write!(f, "meter"),
        }
    }
}

/// One turbine telemetry sample. Numeric fields are `None` when the source
/// cell was empty or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub power_kw: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_direction_deg: Option<f64>,
}

/// One commercial meter reading covering the interval starting at
/// `timestamp`; it counts toward the calendar day of `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterRecord {
    pub timestamp: NaiveDateTime,
    pub energy_kwh: Option<f64>,
}

/// Shared shape of the two input series, so validation and quality scoring
/// can be written once.
pub trait SeriesRecord: Copy + Send + Sync {
    const KIND: SeriesKind;
    /// Numeric columns in file order, after the time column.
    const VALUE_COLUMNS: &'static [&'static str];

    fn from_values(timestamp: NaiveDateTime, values: &[Option<f64>]) -> Self;

    fn timestamp(&self) -> NaiveDateTime;

    /// True when every field needed for energy estimation is present.
    fn has_critical_values(&self) -> bool;

    /// Negative power or energy: kept, but reported as an anomaly.
    fn has_negative_output(&self) -> bool;
}

impl SeriesRecord for TelemetryRecord {
    const KIND: SeriesKind = SeriesKind::Telemetry;
    const VALUE_COLUMNS: &'static [&'static str] =
        &["power_kw", "wind_speed_ms", "wind_direction_deg"];

    fn from_values(timestamp: NaiveDateTime, values: &[Option<f64>]) -> Self {
        let value = |idx: usize| values.get(idx).copied().flatten();
        Self {
            timestamp,
            power_kw: value(0),
            wind_speed_ms: value(1),
            wind_direction_deg: value(2),
        }
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn has_critical_values(&self) -> bool {
        self.power_kw.is_some() && self.wind_speed_ms.is_some()
    }

    fn has_negative_output(&self) -> bool {
        matches!(self.power_kw, Some(power) if power < 0.0)
    }
}

impl SeriesRecord for MeterRecord {
    const KIND: SeriesKind = SeriesKind::Meter;
    const VALUE_COLUMNS: &'static [&'static str] = &["energy_kwh"];

    fn from_values(timestamp: NaiveDateTime, values: &[Option<f64>]) -> Self {
        Self {
            timestamp,
            energy_kwh: values.first().copied().flatten(),
        }
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn has_critical_values(&self) -> bool {
        self.energy_kwh.is_some()
    }

    fn has_negative_output(&self) -> bool {
        matches!(self.energy_kwh, Some(energy) if energy < 0.0)
    }
}

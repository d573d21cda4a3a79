use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::aligned::AlignedDataset;
use crate::domain::calendar::{inclusive_day_span, month_start};
use crate::domain::records::MeterRecord;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("rated capacity must be positive, got {0} kW")]
    InvalidRatedCapacity(f64),
    #[error("analysis duration must be positive, got {0} hours")]
    InvalidDuration(f64),
    #[error("no usable {0} values in the aligned window")]
    NoUsableValues(&'static str),
    #[error("weibull fit needs at least 2 positive wind speeds, found {0}")]
    TooFewWindSamples(usize),
    #[error("weibull fit did not converge")]
    WeibullNotConverged,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyEnergy {
    /// `YYYY-MM`
    pub month: String,
    pub energy_kwh: f64,
    pub energy_mwh: f64,
    /// Inclusive span between the first and last reading of the month.
    pub days: i64,
    pub avg_daily_mwh: f64,
    pub records: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CapacityFactor {
    pub fraction: f64,
    pub percent: f64,
    pub actual_energy_kwh: f64,
    pub theoretical_energy_kwh: f64,
    pub duration_hours: f64,
    pub rated_capacity_kw: f64,
}

struct MonthAccumulator {
    energy_kwh: f64,
    records: usize,
    first: NaiveDate,
    last: NaiveDate,
}

/// Groups meter readings by calendar month. Missing and negative readings
/// are left out of the sums; months without any usable reading are omitted.
pub fn compute_monthly_energy(meter: &[MeterRecord]) -> Vec<MonthlyEnergy> {
    let mut months: BTreeMap<NaiveDate, MonthAccumulator> = BTreeMap::new();
    let mut negatives = 0usize;

    for record in meter {
        let Some(energy) = record.energy_kwh else {
            continue;
        };
        if energy < 0.0 {
            negatives += 1;
            continue;
        }
        let date = record.timestamp.date();
        months
            .entry(month_start(date))
            .and_modify(|month| {
                month.energy_kwh += energy;
                month.records += 1;
                month.first = month.first.min(date);
                month.last = month.last.max(date);
            })
            .or_insert(MonthAccumulator {
                energy_kwh: energy,
                records: 1,
                first: date,
                last: date,
            });
    }

    if negatives > 0 {
        warn!(negatives, "negative meter readings left out of monthly energy");
    }

    let rollup: Vec<MonthlyEnergy> = months
        .into_iter()
        .map(|(start, month)| {
            let days = inclusive_day_span(month.first, month.last);
            let energy_mwh = month.energy_kwh / 1_000.0;
            MonthlyEnergy {
                month: start.format("%Y-%m").to_string(),
                energy_kwh: month.energy_kwh,
                energy_mwh,
                days,
                avg_daily_mwh: energy_mwh / days as f64,
                records: month.records,
            }
        })
        .collect();

    debug!(months = rollup.len(), "monthly energy computed");
    rollup
}

/// `actual / (rated * hours)`. Implausible values are logged, not rejected.
pub fn capacity_factor(
    actual_energy_kwh: f64,
    rated_capacity_kw: f64,
    duration_hours: f64,
) -> Result<CapacityFactor, AggregateError> {
    if !(rated_capacity_kw.is_finite() && rated_capacity_kw > 0.0) {
        return Err(AggregateError::InvalidRatedCapacity(rated_capacity_kw));
    }
    if !(duration_hours.is_finite() && duration_hours > 0.0) {
        return Err(AggregateError::InvalidDuration(duration_hours));
    }

    let theoretical_energy_kwh = rated_capacity_kw * duration_hours;
    let fraction = actual_energy_kwh / theoretical_energy_kwh;
    let percent = fraction * 100.0;

    if percent > 100.0 {
        warn!(percent, "capacity factor exceeds 100%, check the rated capacity");
    } else if percent > 70.0 {
        warn!(percent, "capacity factor is unusually high");
    } else if percent < 5.0 {
        warn!(percent, "capacity factor is unusually low, plant downtime or data gaps?");
    }

    Ok(CapacityFactor {
        fraction,
        percent,
        actual_energy_kwh,
        theoretical_energy_kwh,
        duration_hours,
        rated_capacity_kw,
    })
}

/// Capacity factor of the aligned window from its non-negative meter energy.
pub fn capacity_factor_for(
    dataset: &AlignedDataset,
    rated_capacity_kw: f64,
) -> Result<CapacityFactor, AggregateError> {
    let readings: Vec<f64> = dataset
        .meter
        .iter()
        .filter_map(|record| record.energy_kwh)
        .filter(|energy| *energy >= 0.0)
        .collect();
    if readings.is_empty() {
        return Err(AggregateError::NoUsableValues("energy_kwh"));
    }

    let result = capacity_factor(
        readings.iter().sum(),
        rated_capacity_kw,
        dataset.duration_hours(),
    )?;
    info!(percent = result.percent, "capacity factor computed");
    Ok(result)
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::resampling::AlignedResample;

/// Mean days per year used to annualise partial or bootstrapped windows.
pub const DAYS_PER_YEAR: f64 = 365.25;
pub const HOURS_PER_YEAR: f64 = DAYS_PER_YEAR * 24.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("resample is degenerate: {0}")]
    DegenerateSample(String),
    #[error("estimate is not a finite non-negative energy: {0}")]
    InvalidEstimate(f64),
    #[error("estimator failed: {0}")]
    Failed(String),
}

/// Converts one resample of the aligned dataset into one annual energy
/// estimate in MWh. Called concurrently from many draws.
pub trait EnergyEstimator: Send + Sync {
    fn estimate_annual_energy(&self, resample: &AlignedResample<'_>) -> Result<f64, EstimatorError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    MeterAnnualized,
    TelemetryAnnualized,
}

impl EstimatorKind {
    pub fn build(self) -> Box<dyn EnergyEstimator> {
        match self {
            EstimatorKind::MeterAnnualized => Box::new(MeterAnnualizedEstimator),
            EstimatorKind::TelemetryAnnualized => Box::new(TelemetryAnnualizedEstimator),
        }
    }
}

/// Sums the metered energy of the sampled days and scales it to a year.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeterAnnualizedEstimator;

impl EnergyEstimator for MeterAnnualizedEstimator {
    fn estimate_annual_energy(&self, resample: &AlignedResample<'_>) -> Result<f64, EstimatorError> {
        let days = resample.day_count();
        if days == 0 {
            return Err(EstimatorError::DegenerateSample("no days sampled".to_string()));
        }

        let mut readings = 0usize;
        let total_kwh: f64 = resample
            .meter()
            .filter_map(|record| record.energy_kwh)
            .inspect(|_| readings += 1)
            .sum();
        if readings == 0 {
            return Err(EstimatorError::DegenerateSample(
                "no meter readings in sampled days".to_string(),
            ));
        }

        let annual_mwh = total_kwh / 1_000.0 * DAYS_PER_YEAR / days as f64;
        validate_estimate(annual_mwh)
    }
}

/// Averages sampled turbine power and scales it to a year of operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryAnnualizedEstimator;

impl EnergyEstimator for TelemetryAnnualizedEstimator {
    fn estimate_annual_energy(&self, resample: &AlignedResample<'_>) -> Result<f64, EstimatorError> {
        let (count, total_kw) = resample
            .telemetry()
            .filter_map(|record| record.power_kw)
            .fold((0usize, 0.0_f64), |(count, sum), power| (count + 1, sum + power));
        if count == 0 {
            return Err(EstimatorError::DegenerateSample(
                "no power readings in sampled days".to_string(),
            ));
        }

        let mean_kw = total_kw / count as f64;
        validate_estimate(mean_kw * HOURS_PER_YEAR / 1_000.0)
    }
}

/// Accepts finite, non-negative annual energy values.
pub fn validate_estimate(value: f64) -> Result<f64, EstimatorError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EstimatorError::InvalidEstimate(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aligned::AlignedDataset;
    use crate::services::alignment::align_series;
    use crate::services::resampling::DailyBlocks;
    use crate::test_support::{daily_meter, daily_telemetry, on_date};

    fn constant_dataset(energy_per_day_kwh: f64) -> AlignedDataset {
        let telemetry = daily_telemetry(on_date(2023, 1, 1), 365);
        let meter = daily_meter(on_date(2023, 1, 1), 365)
            .into_iter()
            .map(|mut record| {
                record.energy_kwh = Some(energy_per_day_kwh);
                record
            })
            .collect::<Vec<_>>();
        align_series(&telemetry, &meter).unwrap()
    }

    #[test]
    fn meter_estimator_annualizes_daily_energy() {
        let dataset = constant_dataset(10_000.0);
        let blocks = DailyBlocks::new(&dataset);
        let resample = AlignedResample::new(&dataset, &blocks, (0..365).collect(), 1.0);

        let estimate = MeterAnnualizedEstimator
            .estimate_annual_energy(&resample)
            .unwrap();
        assert!((estimate - 10.0 * DAYS_PER_YEAR).abs() < 1e-9);
    }

    #[test]
    fn meter_estimator_rejects_net_negative_energy() {
        let dataset = constant_dataset(-5.0);
        let blocks = DailyBlocks::new(&dataset);
        let resample = AlignedResample::new(&dataset, &blocks, vec![0, 1, 2], 1.0);

        let err = MeterAnnualizedEstimator
            .estimate_annual_energy(&resample)
            .unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidEstimate(value) if value < 0.0));
    }

    #[test]
    fn empty_resample_is_degenerate() {
        let dataset = constant_dataset(1.0);
        let blocks = DailyBlocks::new(&dataset);
        let resample = AlignedResample::new(&dataset, &blocks, Vec::new(), 1.0);

        assert!(matches!(
            MeterAnnualizedEstimator.estimate_annual_energy(&resample),
            Err(EstimatorError::DegenerateSample(_))
        ));
        assert!(matches!(
            TelemetryAnnualizedEstimator.estimate_annual_energy(&resample),
            Err(EstimatorError::DegenerateSample(_))
        ));
    }

    #[test]
    fn telemetry_estimator_uses_mean_power() {
        let dataset = constant_dataset(1.0);
        let blocks = DailyBlocks::new(&dataset);
        let resample = AlignedResample::new(&dataset, &blocks, (0..365).collect(), 1.0);

        let mean_kw = dataset.telemetry.iter().filter_map(|r| r.power_kw).sum::<f64>()
            / dataset.telemetry.len() as f64;
        let estimate = EstimatorKind::TelemetryAnnualized
            .build()
            .estimate_annual_energy(&resample)
            .unwrap();
        assert!((estimate - mean_kw * HOURS_PER_YEAR / 1_000.0).abs() < 1e-6);
    }
}

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Weibull};

use crate::domain::records::{MeterRecord, TelemetryRecord};
use crate::services::estimator::{
    EnergyEstimator, EstimatorError, MeterAnnualizedEstimator, HOURS_PER_YEAR,
};
use crate::services::resampling::AlignedResample;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RATED_POWER_KW: f64 = 2_000.0;
const METER_EFFICIENCY: f64 = 0.97;

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn on_datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    on_date(year, month, day).and_hms_opt(hour, minute, 0).unwrap()
}

/// One telemetry record per day at midnight.
pub fn daily_telemetry(start: NaiveDate, days: i64) -> Vec<TelemetryRecord> {
    (0..days)
        .map(|day| TelemetryRecord {
            timestamp: midnight(start + Duration::days(day)),
            power_kw: Some(500.0 + (day % 7) as f64 * 100.0),
            wind_speed_ms: Some(4.0 + (day % 10) as f64),
            wind_direction_deg: Some(180.0),
        })
        .collect()
}

/// One meter reading per day at midnight.
pub fn daily_meter(start: NaiveDate, days: i64) -> Vec<MeterRecord> {
    (0..days)
        .map(|day| MeterRecord {
            timestamp: midnight(start + Duration::days(day)),
            energy_kwh: Some(12_000.0 + (day % 5) as f64 * 1_000.0),
        })
        .collect()
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap()
}

/// Idealised 2 MW turbine: cubic between 3 and 12 m/s, flat to 25 m/s.
pub fn reference_power_kw(wind_speed: f64) -> f64 {
    match wind_speed {
        v if v < 3.0 => 0.0,
        v if v < 12.0 => RATED_POWER_KW * ((v - 3.0) / 9.0).powi(3),
        v if v <= 25.0 => RATED_POWER_KW,
        _ => 0.0,
    }
}

/// Deterministic plant history: Weibull winds with a day-to-day scale
/// factor, telemetry every `telemetry_step_minutes` and hourly meter energy
/// integrated from that telemetry.
pub struct SyntheticPlant {
    telemetry: Vec<TelemetryRecord>,
    meter: Vec<MeterRecord>,
}

impl SyntheticPlant {
    pub fn new(start: NaiveDateTime, days: i64, telemetry_step_minutes: i64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let day_factor = Normal::<f64>::new(1.0, 0.25).unwrap();
        let samples_per_day = (24 * 60) / telemetry_step_minutes;
        let hours = (days * 24) as usize;

        let mut telemetry = Vec::with_capacity((days * samples_per_day) as usize);
        let mut hourly_energy = vec![0.0_f64; hours];
        for day in 0..days {
            let factor: f64 = day_factor.sample(&mut rng);
            let scale = 7.5 * factor.max(0.3);
            let winds = Weibull::new(scale, 2.2).unwrap();
            for step in 0..samples_per_day {
                let offset = Duration::minutes(day * 24 * 60 + step * telemetry_step_minutes);
                let wind_speed = winds.sample(&mut rng);
                let power = reference_power_kw(wind_speed);
                telemetry.push(TelemetryRecord {
                    timestamp: start + offset,
                    power_kw: Some(power),
                    wind_speed_ms: Some(wind_speed),
                    wind_direction_deg: Some(rng.gen_range(0.0..360.0)),
                });
                let hour = (offset.num_minutes() / 60) as usize;
                if let Some(energy) = hourly_energy.get_mut(hour) {
                    *energy += power * telemetry_step_minutes as f64 / 60.0 * METER_EFFICIENCY;
                }
            }
        }

        let meter = hourly_energy
            .into_iter()
            .enumerate()
            .map(|(hour, energy)| MeterRecord {
                timestamp: start + Duration::hours(hour as i64),
                energy_kwh: Some(energy),
            })
            .collect();

        Self { telemetry, meter }
    }

    pub fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.telemetry.clone()
    }

    pub fn meter(&self) -> Vec<MeterRecord> {
        self.meter.clone()
    }

    pub fn telemetry_csv(&self) -> String {
        let mut csv = String::from("time,power_kw,wind_speed_ms,wind_direction_deg\n");
        for record in &self.telemetry {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                record.timestamp.format(TIMESTAMP_FORMAT),
                cell(record.power_kw),
                cell(record.wind_speed_ms),
                cell(record.wind_direction_deg),
            ));
        }
        csv
    }

    pub fn meter_csv(&self) -> String {
        let mut csv = String::from("time,energy_kwh\n");
        for record in &self.meter {
            csv.push_str(&format!(
                "{},{}\n",
                record.timestamp.format(TIMESTAMP_FORMAT),
                cell(record.energy_kwh),
            ));
        }
        csv
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

/// Mean sampled meter reading scaled to a year, without day weighting.
pub struct MeanMeterEstimator;

impl EnergyEstimator for MeanMeterEstimator {
    fn estimate_annual_energy(&self, resample: &AlignedResample<'_>) -> Result<f64, EstimatorError> {
        let (count, total) = resample
            .meter()
            .filter_map(|record| record.energy_kwh)
            .fold((0usize, 0.0), |(count, total), energy| (count + 1, total + energy));
        if count == 0 {
            return Err(EstimatorError::DegenerateSample("no meter readings".to_string()));
        }
        Ok(total / count as f64 * HOURS_PER_YEAR / 1_000.0)
    }
}

/// Fails every draw whose first sampled day index is a multiple of
/// `divisor`; otherwise behaves like [`MeterAnnualizedEstimator`].
pub struct FailingEveryNthDayEstimator {
    pub divisor: usize,
}

impl EnergyEstimator for FailingEveryNthDayEstimator {
    fn estimate_annual_energy(&self, resample: &AlignedResample<'_>) -> Result<f64, EstimatorError> {
        match resample.picks().first() {
            Some(day) if day % self.divisor.max(1) == 0 => {
                Err(EstimatorError::Failed(format!("regression did not converge for day {day}")))
            }
            _ => MeterAnnualizedEstimator.estimate_annual_energy(resample),
        }
    }
}

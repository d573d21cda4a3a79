use serde::Serialize;
use statrs::function::gamma::gamma;
use tracing::{debug, info, warn};

use crate::domain::records::TelemetryRecord;
use crate::services::energy_analysis::AggregateError;
use crate::services::histogram::{compute_histogram, Histogram};
use crate::services::percentiles::{sorted_copy, value_sorted};
use crate::services::simulation_types::SampleStatistics;

const WEIBULL_MAX_ITERATIONS: usize = 100;
const WEIBULL_TOLERANCE: f64 = 1e-10;
const WEIBULL_RELIABLE_SAMPLES: usize = 100;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WindStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
    pub excluded_negative: usize,
    pub histogram: Histogram,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WeibullFit {
    pub shape_k: f64,
    pub scale_c: f64,
    pub mean_speed: f64,
    pub valid_samples: usize,
}

/// Wind-speed statistics of the telemetry. Negative speeds are left out.
pub fn compute_wind_statistics(telemetry: &[TelemetryRecord]) -> Result<WindStats, AggregateError> {
    let speeds: Vec<f64> = telemetry.iter().filter_map(|r| r.wind_speed_ms).collect();
    let excluded_negative = speeds.iter().filter(|speed| **speed < 0.0).count();
    if excluded_negative > 0 {
        warn!(excluded_negative, "negative wind speeds left out of wind statistics");
    }

    let sorted = sorted_copy(
        &speeds
            .into_iter()
            .filter(|speed| *speed >= 0.0)
            .collect::<Vec<_>>(),
    );
    let Some(median) = value_sorted(&sorted, 50.0) else {
        return Err(AggregateError::NoUsableValues("wind_speed_ms"));
    };
    let summary = SampleStatistics::from_sorted(&sorted);

    info!(
        mean = summary.mean,
        median,
        samples = sorted.len(),
        "wind statistics computed"
    );

    Ok(WindStats {
        mean: summary.mean,
        median,
        std: summary.std,
        min: summary.min,
        max: summary.max,
        sample_count: sorted.len(),
        excluded_negative,
        histogram: compute_histogram(&sorted),
    })
}

/// Two-parameter Weibull fit (location fixed at zero) by maximum likelihood.
///
/// The shape solves
/// `sum(x^k ln x) / sum(x^k) - 1/k - mean(ln x) = 0`
/// by Newton iteration, and the scale follows as `(mean(x^k))^(1/k)`.
/// Speeds are divided by their maximum first so `x^k` cannot overflow.
pub fn compute_weibull_fit(telemetry: &[TelemetryRecord]) -> Result<WeibullFit, AggregateError> {
    let speeds: Vec<f64> = telemetry
        .iter()
        .filter_map(|r| r.wind_speed_ms)
        .filter(|speed| speed.is_finite() && *speed > 0.0)
        .collect();
    if speeds.len() < 2 {
        return Err(AggregateError::TooFewWindSamples(speeds.len()));
    }
    if speeds.len() < WEIBULL_RELIABLE_SAMPLES {
        warn!(samples = speeds.len(), "weibull fit may be unreliable with few samples");
    }

    let max_speed = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let logs: Vec<f64> = speeds.iter().map(|speed| (speed / max_speed).ln()).collect();
    let count = logs.len() as f64;
    let mean_log = logs.iter().sum::<f64>() / count;
    let log_std = (logs.iter().map(|l| (l - mean_log).powi(2)).sum::<f64>() / count).sqrt();
    if log_std <= f64::EPSILON {
        return Err(AggregateError::WeibullNotConverged);
    }

    let mut shape = std::f64::consts::PI / (6.0_f64.sqrt() * log_std);
    let mut converged = false;
    for _ in 0..WEIBULL_MAX_ITERATIONS {
        let (mut s0, mut s1, mut s2) = (0.0, 0.0, 0.0);
        for log in &logs {
            let weight = (shape * log).exp();
            s0 += weight;
            s1 += weight * log;
            s2 += weight * log * log;
        }
        let value = s1 / s0 - 1.0 / shape - mean_log;
        let slope = (s2 * s0 - s1 * s1) / (s0 * s0) + 1.0 / (shape * shape);
        let mut next = shape - value / slope;
        if !next.is_finite() {
            break;
        }
        if next <= 0.0 {
            next = shape / 2.0;
        }
        let step = (next - shape).abs();
        shape = next;
        if step < WEIBULL_TOLERANCE * shape.max(1.0) {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(AggregateError::WeibullNotConverged);
    }

    let mean_power = logs.iter().map(|log| (shape * log).exp()).sum::<f64>() / count;
    let scale = max_speed * mean_power.powf(1.0 / shape);
    let mean_speed = scale * gamma(1.0 + 1.0 / shape);

    if !(0.5..=10.0).contains(&shape) {
        warn!(shape, "weibull shape outside the usual range");
    }
    debug!(shape, scale, mean_speed, "weibull fit complete");

    Ok(WeibullFit {
        shape_k: shape,
        scale_c: scale,
        mean_speed,
        valid_samples: speeds.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::histogram::HISTOGRAM_BINS;
    use crate::test_support::on_datetime;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Weibull};

    fn telemetry_with_speeds(speeds: &[Option<f64>]) -> Vec<TelemetryRecord> {
        let start = on_datetime(2023, 1, 1, 0, 0);
        speeds
            .iter()
            .enumerate()
            .map(|(idx, speed)| TelemetryRecord {
                timestamp: start + Duration::minutes(10 * idx as i64),
                power_kw: Some(100.0),
                wind_speed_ms: *speed,
                wind_direction_deg: Some(180.0),
            })
            .collect()
    }

    #[test]
    fn statistics_skip_missing_and_negative_speeds() {
        let telemetry = telemetry_with_speeds(&[
            Some(2.0),
            Some(4.0),
            None,
            Some(-1.0),
            Some(6.0),
            Some(8.0),
        ]);

        let stats = compute_wind_statistics(&telemetry).unwrap();

        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.excluded_negative, 1);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 8.0);
        assert!((stats.std - (20.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.histogram.counts.len(), HISTOGRAM_BINS);
        assert_eq!(stats.histogram.total(), 4);
    }

    #[test]
    fn statistics_without_speeds_fail() {
        let telemetry = telemetry_with_speeds(&[None, Some(-2.0)]);
        assert_eq!(
            compute_wind_statistics(&telemetry).unwrap_err(),
            AggregateError::NoUsableValues("wind_speed_ms")
        );
    }

    #[test]
    fn weibull_fit_recovers_known_parameters() {
        let distribution = Weibull::new(8.0, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        let speeds: Vec<Option<f64>> = (0..20_000)
            .map(|_| Some(distribution.sample(&mut rng)))
            .collect();

        let fit = compute_weibull_fit(&telemetry_with_speeds(&speeds)).unwrap();

        assert!((fit.shape_k - 2.0).abs() < 0.05, "shape {}", fit.shape_k);
        assert!((fit.scale_c - 8.0).abs() < 0.15, "scale {}", fit.scale_c);
        assert!((fit.mean_speed - 8.0 * gamma(1.5)).abs() < 0.15);
        assert_eq!(fit.valid_samples, 20_000);
    }

    #[test]
    fn weibull_fit_ignores_calm_periods() {
        let telemetry = telemetry_with_speeds(&[Some(0.0), Some(3.0), Some(5.0), Some(9.0)]);
        let fit = compute_weibull_fit(&telemetry).unwrap();
        assert_eq!(fit.valid_samples, 3);
        assert!(fit.shape_k > 0.0 && fit.scale_c > 0.0);
    }

    #[test]
    fn weibull_fit_needs_two_positive_speeds() {
        let telemetry = telemetry_with_speeds(&[Some(0.0), Some(4.0)]);
        assert_eq!(
            compute_weibull_fit(&telemetry).unwrap_err(),
            AggregateError::TooFewWindSamples(1)
        );
    }
}

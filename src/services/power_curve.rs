use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::records::TelemetryRecord;
use crate::services::energy_analysis::AggregateError;

pub const MAX_WIND_BIN_MS: usize = 30;
const CUT_IN_MIN_SAMPLES: usize = 5;
const CUT_IN_MIN_POWER_KW: f64 = 10.0;
const RATED_POWER_SHARE: f64 = 0.95;

/// One 1 m/s wind-speed bin `(lower, upper]`; the first bin also holds 0.
/// Power statistics are `None` when the bin has too few samples.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PowerCurveBin {
    pub wind_speed_ms: f64,
    pub lower_ms: f64,
    pub upper_ms: f64,
    pub count: usize,
    pub avg_power_kw: Option<f64>,
    pub std_power_kw: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PowerCurveSummary {
    pub total_bins: usize,
    pub non_empty_bins: usize,
    pub max_power_kw: f64,
    pub cut_in_speed_ms: Option<f64>,
    pub rated_power_kw: Option<f64>,
    pub total_records: usize,
    pub excluded_negative_wind: usize,
    pub excluded_negative_power: usize,
    pub excluded_above_range: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PowerCurve {
    pub bins: Vec<PowerCurveBin>,
    pub summary: PowerCurveSummary,
}

#[derive(Default)]
struct BinAccumulator {
    count: usize,
    sum: f64,
    sum_squares: f64,
}

pub fn generate_power_curve(telemetry: &[TelemetryRecord]) -> Result<PowerCurve, AggregateError> {
    let mut excluded_negative_wind = 0usize;
    let mut excluded_negative_power = 0usize;
    let pairs: Vec<(f64, f64)> = telemetry
        .iter()
        .filter_map(|record| Some((record.wind_speed_ms?, record.power_kw?)))
        .filter(|(wind, power)| {
            if *wind < 0.0 {
                excluded_negative_wind += 1;
                false
            } else if *power < 0.0 {
                excluded_negative_power += 1;
                false
            } else {
                true
            }
        })
        .collect();
    if excluded_negative_wind + excluded_negative_power > 0 {
        warn!(
            excluded_negative_wind,
            excluded_negative_power, "negative samples left out of the power curve"
        );
    }
    if pairs.is_empty() {
        return Err(AggregateError::NoUsableValues("wind_speed_ms/power_kw"));
    }

    let max_wind = pairs.iter().map(|(wind, _)| *wind).fold(0.0, f64::max);
    // Clamp before the cast; a huge but finite speed would otherwise overflow.
    let bin_count = (max_wind.ceil() + 1.0).min(MAX_WIND_BIN_MS as f64) as usize;

    let mut accumulators: Vec<BinAccumulator> =
        (0..bin_count).map(|_| BinAccumulator::default()).collect();
    let mut excluded_above_range = 0usize;
    let mut max_power_kw = 0.0_f64;
    for (wind, power) in &pairs {
        max_power_kw = max_power_kw.max(*power);
        match accumulators.get_mut(bin_index(*wind)) {
            Some(bin) => {
                bin.count += 1;
                bin.sum += power;
                bin.sum_squares += power * power;
            }
            None => excluded_above_range += 1,
        }
    }

    let bins: Vec<PowerCurveBin> = accumulators
        .iter()
        .enumerate()
        .map(|(idx, acc)| {
            let lower = idx as f64;
            let mean = (acc.count > 0).then(|| acc.sum / acc.count as f64);
            let std = mean.filter(|_| acc.count > 1).map(|mean| {
                let variance =
                    (acc.sum_squares - acc.count as f64 * mean * mean) / (acc.count as f64 - 1.0);
                variance.max(0.0).sqrt()
            });
            PowerCurveBin {
                wind_speed_ms: lower + 0.5,
                lower_ms: lower,
                upper_ms: lower + 1.0,
                count: acc.count,
                avg_power_kw: mean,
                std_power_kw: std,
            }
        })
        .collect();

    let cut_in_speed_ms = bins
        .iter()
        .find(|bin| {
            bin.count > CUT_IN_MIN_SAMPLES
                && bin.avg_power_kw.is_some_and(|power| power > CUT_IN_MIN_POWER_KW)
        })
        .map(|bin| bin.wind_speed_ms);
    let rated_power_kw = (max_power_kw > 0.0
        && bins.iter().any(|bin| {
            bin.avg_power_kw
                .is_some_and(|power| power >= max_power_kw * RATED_POWER_SHARE)
        }))
    .then_some(max_power_kw);

    let summary = PowerCurveSummary {
        total_bins: bins.len(),
        non_empty_bins: bins.iter().filter(|bin| bin.count > 0).count(),
        max_power_kw,
        cut_in_speed_ms,
        rated_power_kw,
        total_records: pairs.len(),
        excluded_negative_wind,
        excluded_negative_power,
        excluded_above_range,
    };

    info!(
        non_empty_bins = summary.non_empty_bins,
        total_bins = summary.total_bins,
        max_power_kw,
        "power curve generated"
    );
    if let Some(speed) = cut_in_speed_ms {
        debug!(speed, "detected cut-in wind speed");
    }

    Ok(PowerCurve { bins, summary })
}

/// Right-closed 1 m/s bins: `[0, 1]`, `(1, 2]`, `(2, 3]`...
fn bin_index(wind_speed: f64) -> usize {
    if wind_speed <= 1.0 {
        0
    } else {
        wind_speed.ceil() as usize - 1
    }
}

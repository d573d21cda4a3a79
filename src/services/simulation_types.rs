use serde::Serialize;

use crate::services::histogram::Histogram;

pub const ENERGY_UNITS: &str = "MWh/yr";

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SampleStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl SampleStatistics {
    /// Summary of an ascending slice; sample standard deviation (n - 1).
    pub fn from_sorted(sorted: &[f64]) -> Self {
        let (Some(min), Some(max)) = (sorted.first().copied(), sorted.last().copied()) else {
            return Self {
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
            };
        };
        let count = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / count;
        let std = if sorted.len() > 1 {
            let squares: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1.0)).sqrt()
        } else {
            0.0
        };
        Self {
            mean,
            std,
            min,
            max,
        }
    }
}

/// Raw output of the Monte Carlo engine. `samples` keeps draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub samples: Vec<f64>,
    pub p50: f64,
    pub p90: f64,
    pub statistics: SampleStatistics,
    pub requested_draws: usize,
    pub failed_draws: usize,
    pub seed: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub iterations: usize,
    pub successful_draws: usize,
    pub failed_draws: usize,
    pub seed: u64,
    pub statistics: SampleStatistics,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AepResult {
    pub p50: f64,
    pub p90: f64,
    pub units: String,
    pub samples: Vec<f64>,
    pub histogram: Histogram,
    pub simulation: SimulationSummary,
}

impl AepResult {
    pub fn from_simulation(result: SimulationResult, histogram: Histogram) -> Self {
        let simulation = SimulationSummary {
            iterations: result.requested_draws,
            successful_draws: result.samples.len(),
            failed_draws: result.failed_draws,
            seed: result.seed,
            statistics: result.statistics,
        };
        Self {
            p50: result.p50,
            p90: result.p90,
            units: ENERGY_UNITS.to_string(),
            samples: result.samples,
            histogram,
            simulation,
        }
    }
}

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::aligned::AlignedDataset;
use crate::services::estimator::{validate_estimate, EnergyEstimator, EstimatorError};
use crate::services::percentiles::{exceedance_sorted, sorted_copy, value_sorted};
use crate::services::resampling::{Resampler, ResamplingError, ResamplingScheme};
use crate::services::simulation_types::{SampleStatistics, SimulationResult};

pub const MIN_ITERATIONS: usize = 50;
pub const MAX_ITERATIONS: usize = 10_000;
pub const DEFAULT_MIN_SUCCESS_FRACTION: f64 = 0.5;

/// Per-draw errors kept on a failed run for diagnostics.
const ERROR_SAMPLE_SIZE: usize = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error(
        "iterations must be between {min} and {max}, got {0}",
        min = MIN_ITERATIONS,
        max = MAX_ITERATIONS
    )]
    InvalidIterations(usize),
    #[error("minimum success fraction must be in (0, 1], got {0}")]
    InvalidSuccessFraction(f64),
    #[error("invalid resampling scheme: {0}")]
    Resampling(#[from] ResamplingError),
    #[error(
        "only {succeeded} of {requested} draws succeeded ({failed} failed), \
         at least {required} are required"
    )]
    TooFewSuccessfulDraws {
        requested: usize,
        succeeded: usize,
        failed: usize,
        required: usize,
        sample_errors: Vec<EstimatorError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub seed: u64,
    pub min_success_fraction: f64,
    pub scheme: ResamplingScheme,
}

impl MonteCarloConfig {
    pub fn new(iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            seed,
            min_success_fraction: DEFAULT_MIN_SUCCESS_FRACTION,
            scheme: ResamplingScheme::default(),
        }
    }
}

/// Runs `config.iterations` independent draws in parallel and reduces the
/// successful estimates to P50/P90.
///
/// Each draw owns an `StdRng` seeded from `(config.seed, draw index)`, so the
/// samples are identical for a given seed regardless of thread scheduling.
pub fn run_simulation(
    dataset: &AlignedDataset,
    estimator: &dyn EnergyEstimator,
    config: &MonteCarloConfig,
) -> Result<SimulationResult, SimulationError> {
    if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&config.iterations) {
        return Err(SimulationError::InvalidIterations(config.iterations));
    }
    if !(config.min_success_fraction > 0.0 && config.min_success_fraction <= 1.0) {
        return Err(SimulationError::InvalidSuccessFraction(
            config.min_success_fraction,
        ));
    }

    let resampler = Resampler::new(dataset, config.scheme)?;
    debug!(
        iterations = config.iterations,
        seed = config.seed,
        scheme = ?config.scheme,
        "starting monte carlo draws"
    );

    let outcomes: Vec<Result<f64, EstimatorError>> = (0..config.iterations)
        .into_par_iter()
        .map(|draw| {
            let mut rng = StdRng::seed_from_u64(draw_seed(config.seed, draw));
            let resample = resampler.draw(&mut rng);
            estimator
                .estimate_annual_energy(&resample)
                .and_then(validate_estimate)
        })
        .collect();

    let mut samples = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => samples.push(value),
            Err(err) => failures.push(err),
        }
    }

    let required = required_successes(config.iterations, config.min_success_fraction);
    if samples.len() < required {
        return Err(SimulationError::TooFewSuccessfulDraws {
            requested: config.iterations,
            succeeded: samples.len(),
            failed: failures.len(),
            required,
            sample_errors: failures.into_iter().take(ERROR_SAMPLE_SIZE).collect(),
        });
    }
    if !failures.is_empty() {
        warn!(
            failed = failures.len(),
            first_error = %failures[0],
            "discarded failed monte carlo draws"
        );
    }

    let sorted = sorted_copy(&samples);
    let p50 = value_sorted(&sorted, 50.0).unwrap_or(0.0);
    let p90 = exceedance_sorted(&sorted, 90.0).unwrap_or(0.0);
    let statistics = SampleStatistics::from_sorted(&sorted);

    info!(p50, p90, draws = samples.len(), "monte carlo simulation complete");

    Ok(SimulationResult {
        samples,
        p50,
        p90,
        statistics,
        requested_draws: config.iterations,
        failed_draws: failures.len(),
        seed: config.seed,
    })
}

/// Draw-local seed; distinct draws get well-separated streams.
fn draw_seed(seed: u64, draw: usize) -> u64 {
    seed ^ (draw as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn required_successes(iterations: usize, fraction: f64) -> usize {
    ((iterations as f64) * fraction).ceil() as usize
}

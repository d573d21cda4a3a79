use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::estimator::EstimatorKind;
use crate::services::resampling::ResamplingScheme;
use crate::services::simulation::{
    DEFAULT_MIN_SUCCESS_FRACTION, MAX_ITERATIONS, MIN_ITERATIONS, MonteCarloConfig,
};

pub const DEFAULT_RATED_CAPACITY_KW: f64 = 2_000.0;
pub const DEFAULT_ITERATIONS: usize = 1_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("rated_capacity_kw must be positive, got {0}")]
    InvalidRatedCapacity(f64),
    #[error(
        "iterations must be between {min} and {max}, got {0}",
        min = MIN_ITERATIONS,
        max = MAX_ITERATIONS
    )]
    InvalidIterations(usize),
    #[error("min_success_fraction must be in (0, 1], got {0}")]
    InvalidSuccessFraction(f64),
}

/// Settings of one analysis request. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub rated_capacity_kw: f64,
    pub iterations: usize,
    /// Random when absent; the seed actually used is part of the report.
    pub seed: Option<u64>,
    pub min_success_fraction: f64,
    pub resampling: ResamplingScheme,
    pub estimator: EstimatorKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rated_capacity_kw: DEFAULT_RATED_CAPACITY_KW,
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            min_success_fraction: DEFAULT_MIN_SUCCESS_FRACTION,
            resampling: ResamplingScheme::default(),
            estimator: EstimatorKind::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_yaml_str(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(path, &content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rated_capacity_kw.is_finite() && self.rated_capacity_kw > 0.0) {
            return Err(ConfigError::InvalidRatedCapacity(self.rated_capacity_kw));
        }
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(ConfigError::InvalidIterations(self.iterations));
        }
        if !(self.min_success_fraction > 0.0 && self.min_success_fraction <= 1.0) {
            return Err(ConfigError::InvalidSuccessFraction(
                self.min_success_fraction,
            ));
        }
        Ok(())
    }

    /// Engine settings for this request, given the seed that was resolved.
    pub fn monte_carlo(&self, seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            iterations: self.iterations,
            seed,
            min_success_fraction: self.min_success_fraction,
            scheme: self.resampling,
        }
    }
}

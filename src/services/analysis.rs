use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::aligned::AnalysisWindow;
use crate::domain::quality::QualityReport;
use crate::domain::records::{MeterRecord, SeriesKind, TelemetryRecord};
use crate::services::alignment::{align_series, AlignmentError};
use crate::services::analysis_config::{AnalysisConfig, ConfigError};
use crate::services::data_quality::generate_quality_report;
use crate::services::energy_analysis::{
    capacity_factor_for, compute_monthly_energy, AggregateError, CapacityFactor, MonthlyEnergy,
};
use crate::services::estimator::EnergyEstimator;
use crate::services::histogram::compute_histogram;
use crate::services::power_curve::{generate_power_curve, PowerCurve};
use crate::services::record_csv::{parse_meter_csv, parse_telemetry_csv, SchemaError, ValidatedSeries};
use crate::services::simulation::{run_simulation, SimulationError};
use crate::services::simulation_types::AepResult;
use crate::services::wind_analysis::{
    compute_weibull_fit, compute_wind_statistics, WeibullFit, WindStats,
};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Schema,
    InsufficientData,
    Alignment,
    Simulation,
    Aggregate,
}

/// Structured form of an [`AnalysisError`] for the presentation layer.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorReport {
    Config {
        message: String,
    },
    Schema {
        series: SeriesKind,
        column: Option<String>,
        message: String,
    },
    InsufficientData {
        total_duration_days: i64,
        raw_span_days: i64,
        buffer_days: i64,
        message: String,
    },
    Alignment {
        message: String,
    },
    Simulation {
        requested: Option<usize>,
        succeeded: Option<usize>,
        failed: Option<usize>,
        sample_errors: Vec<String>,
        message: String,
    },
    Aggregate {
        message: String,
    },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Config(_) => ErrorKind::Config,
            AnalysisError::Schema(_) => ErrorKind::Schema,
            AnalysisError::Alignment(AlignmentError::InsufficientData { .. }) => {
                ErrorKind::InsufficientData
            }
            AnalysisError::Alignment(_) => ErrorKind::Alignment,
            AnalysisError::Simulation(_) => ErrorKind::Simulation,
            AnalysisError::Aggregate(_) => ErrorKind::Aggregate,
        }
    }

    pub fn report(&self) -> ErrorReport {
        let message = self.to_string();
        match self {
            AnalysisError::Config(_) => ErrorReport::Config { message },
            AnalysisError::Schema(err) => ErrorReport::Schema {
                series: err.series(),
                column: err.column().map(str::to_string),
                message,
            },
            AnalysisError::Alignment(AlignmentError::InsufficientData {
                total_duration_days,
                raw_span_days,
                buffer_days,
            }) => ErrorReport::InsufficientData {
                total_duration_days: *total_duration_days,
                raw_span_days: *raw_span_days,
                buffer_days: *buffer_days,
                message,
            },
            AnalysisError::Alignment(_) => ErrorReport::Alignment { message },
            AnalysisError::Simulation(SimulationError::TooFewSuccessfulDraws {
                requested,
                succeeded,
                failed,
                sample_errors,
                ..
            }) => ErrorReport::Simulation {
                requested: Some(*requested),
                succeeded: Some(*succeeded),
                failed: Some(*failed),
                sample_errors: sample_errors.iter().map(ToString::to_string).collect(),
                message,
            },
            AnalysisError::Simulation(_) => ErrorReport::Simulation {
                requested: None,
                succeeded: None,
                failed: None,
                sample_errors: Vec::new(),
                message,
            },
            AnalysisError::Aggregate(_) => ErrorReport::Aggregate { message },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub fingerprint: String,
    pub seed: u64,
    pub config: AnalysisConfig,
    pub window: AnalysisWindow,
    pub quality: QualityReport,
    pub aep: AepResult,
    pub capacity_factor: CapacityFactor,
    pub monthly_energy: Vec<MonthlyEnergy>,
    pub wind: WindStats,
    pub weibull: Option<WeibullFit>,
    pub power_curve: PowerCurve,
}

/// Both input files after schema validation.
#[derive(Debug, Clone)]
pub struct ValidatedInputs {
    pub telemetry: ValidatedSeries<TelemetryRecord>,
    pub meter: ValidatedSeries<MeterRecord>,
}

/// Hex SHA-256 over length-prefixed parts, so `["ab", "c"]` and `["a", "bc"]`
/// differ.
pub fn fingerprint(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Validates both files. The two parses are independent and run in parallel.
pub fn validate_inputs(telemetry_csv: &[u8], meter_csv: &[u8]) -> Result<ValidatedInputs, AnalysisError> {
    let (telemetry, meter) = rayon::join(
        || parse_telemetry_csv(telemetry_csv),
        || parse_meter_csv(meter_csv),
    );
    Ok(ValidatedInputs {
        telemetry: telemetry?,
        meter: meter?,
    })
}

/// Full pipeline over validated inputs: alignment and quality scoring side by
/// side, then the Monte Carlo engine, then the aggregates of the aligned window.
pub fn run_analysis(
    inputs: &ValidatedInputs,
    config: &AnalysisConfig,
    seed: u64,
    estimator: &dyn EnergyEstimator,
) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;

    let (aligned, quality) = rayon::join(
        || align_series(&inputs.telemetry.records, &inputs.meter.records),
        || generate_quality_report(&inputs.telemetry, &inputs.meter),
    );
    let dataset = aligned?;
    info!(
        days = dataset.total_duration_days,
        buffer_days = dataset.buffer_days,
        "series aligned"
    );

    let simulation = run_simulation(&dataset, estimator, &config.monte_carlo(seed))?;
    let histogram = compute_histogram(&simulation.samples);
    let aep = AepResult::from_simulation(simulation, histogram);

    let capacity_factor = capacity_factor_for(&dataset, config.rated_capacity_kw)?;
    let monthly_energy = compute_monthly_energy(&dataset.meter);
    let wind = compute_wind_statistics(&dataset.telemetry)?;
    let weibull = match compute_weibull_fit(&dataset.telemetry) {
        Ok(fit) => Some(fit),
        Err(err) => {
            warn!(error = %err, "weibull fit skipped");
            None
        }
    };
    let power_curve = generate_power_curve(&dataset.telemetry)?;

    Ok(AnalysisReport {
        fingerprint: String::new(),
        seed,
        config: *config,
        window: dataset.window(),
        quality,
        aep,
        capacity_factor,
        monthly_energy,
        wind,
        weibull,
        power_curve,
    })
}

/// Memo for one request or CLI invocation. Validated inputs and finished
/// reports are keyed by content fingerprints; nothing outlives the session.
pub struct AnalysisSession {
    default_seed: u64,
    inputs: HashMap<String, Arc<ValidatedInputs>>,
    reports: HashMap<String, Arc<AnalysisReport>>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    /// Configs without a seed share one random seed for the session.
    pub fn new() -> Self {
        Self::with_default_seed(rand::random())
    }

    pub fn with_default_seed(default_seed: u64) -> Self {
        Self {
            default_seed,
            inputs: HashMap::new(),
            reports: HashMap::new(),
        }
    }

    pub fn cached_reports(&self) -> usize {
        self.reports.len()
    }

    pub fn inputs(&mut self, telemetry_csv: &[u8], meter_csv: &[u8]) -> Result<Arc<ValidatedInputs>, AnalysisError> {
        let key = fingerprint(&[telemetry_csv, meter_csv]);
        if let Some(inputs) = self.inputs.get(&key) {
            debug!(fingerprint = %key, "reusing validated inputs");
            return Ok(Arc::clone(inputs));
        }
        let inputs = Arc::new(validate_inputs(telemetry_csv, meter_csv)?);
        self.inputs.insert(key, Arc::clone(&inputs));
        Ok(inputs)
    }

    pub fn quality(&mut self, telemetry_csv: &[u8], meter_csv: &[u8]) -> Result<QualityReport, AnalysisError> {
        let inputs = self.inputs(telemetry_csv, meter_csv)?;
        Ok(generate_quality_report(&inputs.telemetry, &inputs.meter))
    }

    pub fn analyze(
        &mut self,
        telemetry_csv: &[u8],
        meter_csv: &[u8],
        config: &AnalysisConfig,
    ) -> Result<Arc<AnalysisReport>, AnalysisError> {
        config.validate()?;
        let seed = config.seed.unwrap_or(self.default_seed);
        let resolved = AnalysisConfig {
            seed: Some(seed),
            ..*config
        };
        let config_bytes = serde_json::to_vec(&resolved).map_err(ConfigError::Serialize)?;
        let key = fingerprint(&[telemetry_csv, meter_csv, config_bytes.as_slice()]);
        if let Some(report) = self.reports.get(&key) {
            debug!(fingerprint = %key, "reusing finished analysis");
            return Ok(Arc::clone(report));
        }

        let inputs = self.inputs(telemetry_csv, meter_csv)?;
        let estimator = resolved.estimator.build();
        let mut report = run_analysis(&inputs, &resolved, seed, estimator.as_ref())?;
        report.fingerprint = key.clone();

        let report = Arc::new(report);
        self.reports.insert(key, Arc::clone(&report));
        Ok(report)
    }
}

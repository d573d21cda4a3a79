pub mod alignment;
pub mod analysis;
pub mod analysis_config;
pub mod data_quality;
pub mod energy_analysis;
pub mod estimator;
pub mod histogram;
pub mod percentiles;
pub mod power_curve;
pub mod record_csv;
pub mod resampling;
pub mod simulation;
pub mod simulation_types;
pub mod wind_analysis;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate annual energy production (P50/P90) from telemetry and meter CSV files
    Analyze {
        /// Turbine telemetry CSV (time, power_kw, wind_speed_ms, wind_direction_deg)
        #[arg(short, long)]
        telemetry: String,
        /// Revenue meter CSV (time, energy_kwh)
        #[arg(short, long)]
        meter: String,
        /// Output report file (.yaml, or .json for JSON)
        #[arg(short, long)]
        output: String,
        /// Optional analysis config YAML
        #[arg(short, long)]
        config: Option<String>,
        /// Number of Monte Carlo iterations (50..=10000)
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        /// Rated plant capacity in kW
        #[arg(short, long)]
        rated_capacity_kw: Option<f64>,
        /// Random seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Score the data quality of telemetry and meter CSV files
    Quality {
        /// Turbine telemetry CSV
        #[arg(short, long)]
        telemetry: String,
        /// Revenue meter CSV
        #[arg(short, long)]
        meter: String,
        /// Optional output report file (.yaml or .json)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_overrides_are_optional() {
        let args = CliArgs::parse_from([
            "plant-aep",
            "analyze",
            "-t",
            "scada.csv",
            "-m",
            "meter.csv",
            "-o",
            "report.yaml",
        ]);

        if let Commands::Analyze {
            config,
            iterations,
            rated_capacity_kw,
            seed,
            ..
        } = args.command
        {
            assert!(config.is_none());
            assert!(iterations.is_none());
            assert!(rated_capacity_kw.is_none());
            assert!(seed.is_none());
        } else {
            panic!("expected analyze command");
        }
    }

    #[test]
    fn analyze_accepts_short_overrides() {
        let args = CliArgs::parse_from([
            "plant-aep",
            "analyze",
            "-t",
            "scada.csv",
            "-m",
            "meter.csv",
            "-o",
            "report.json",
            "-n",
            "500",
            "-r",
            "3500",
            "-s",
            "42",
        ]);

        if let Commands::Analyze {
            iterations,
            rated_capacity_kw,
            seed,
            ..
        } = args.command
        {
            assert_eq!(iterations, Some(500));
            assert_eq!(rated_capacity_kw, Some(3_500.0));
            assert_eq!(seed, Some(42));
        } else {
            panic!("expected analyze command");
        }
    }
}

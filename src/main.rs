use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use plant_aep::commands::analyze_cmd::analyze_command;
use plant_aep::commands::base_commands::{CliArgs, Commands};
use plant_aep::commands::quality_cmd::quality_command;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // stdout carries the report; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    match args.command {
        cmd @ Commands::Analyze { .. } => analyze_command(cmd),
        cmd @ Commands::Quality { .. } => quality_command(cmd),
        Commands::Completions { shell } => {
            let mut command = CliArgs::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut io::stdout());
            ExitCode::SUCCESS
        }
    }
}

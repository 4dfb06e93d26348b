//! Appboot CLI - host harness for the process bootstrap orchestrator.
//!
//! Runs the application lifecycle against the simulated host so startup
//! ordering, locale convergence, warm-up isolation and shutdown can be
//! observed without a device.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use appboot::logging::{init_logging, LoggingConfig};
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "appboot", version, about = "Process bootstrap orchestrator harness")]
struct Cli {
    /// Configuration file (default: <config dir>/appboot/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. debug, appboot=trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write a daily rolling log file into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run attach -> create -> warm-up -> terminate against the simulator
    Simulate(SimulateArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut logging = LoggingConfig::default().with_level(cli.log_level.clone());
    if let Some(dir) = &cli.log_dir {
        logging = logging.with_log_dir(dir);
    }
    let _guard = init_logging(&logging)?;

    match cli.command {
        Commands::Simulate(args) => {
            let (config, _) = commands::load_config(cli.config.as_deref())?;
            commands::simulate::run(args, config)
        }
        Commands::Config { command } => commands::config::run(command, cli.config.as_deref()),
    }
}

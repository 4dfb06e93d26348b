//! Configuration CLI commands.
//!
//! Provides `config path` and `config show` for inspecting where the
//! configuration lives and what the effective values are.

use std::path::Path;

use appboot::app::default_config_path;
use clap::Subcommand;

use super::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration as INI
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(config_path),
        ConfigCommands::Show => run_show(config_path),
    }
}

fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    match config_path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => {
            let status = if path.is_file() { "" } else { " (not created)" };
            println!("{}{}", path.display(), status);
        }
        None => println!("(no configuration directory on this platform)"),
    }
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let (config, source) = load_config(config_path)?;
    match source {
        Some(path) => println!("; loaded from {}", path.display()),
        None => println!("; built-in defaults"),
    }

    let mut out = std::io::stdout();
    config.to_ini().write_to(&mut out)?;
    Ok(())
}

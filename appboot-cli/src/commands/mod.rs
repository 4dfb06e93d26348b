//! CLI command implementations.

pub mod config;
pub mod simulate;

use std::path::{Path, PathBuf};

use appboot::app::{default_config_path, AppConfig};

use crate::error::CliError;

/// Load the effective configuration.
///
/// An explicit `path` must exist. Without one the default location is used
/// if a file is present there, otherwise built-in defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>), CliError> {
    match path {
        Some(path) => Ok((AppConfig::default().load_file(path)?, Some(path.to_path_buf()))),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => Ok((AppConfig::default().load_file(&path)?, Some(path))),
            None => Ok((AppConfig::default(), None)),
        },
    }
}

//! CLI error type.

use std::fmt;

use appboot::app::{AppError, ConfigError};
use appboot::logging::LoggingError;

/// Errors surfaced to the user by the `appboot` binary.
#[derive(Debug)]
pub enum CliError {
    /// Startup failed in a fatal step.
    App(AppError),

    /// Configuration could not be loaded.
    Config(ConfigError),

    /// The logging subscriber could not be installed.
    Logging(LoggingError),

    /// Invalid command-line input.
    InvalidArgument(String),

    /// Failed to install the Ctrl-C handler.
    Signal(String),

    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::App(e) => write!(f, "Startup failed: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArgument(_) | CliError::Signal(_) => None,
        }
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_display() {
        let err = CliError::InvalidArgument("--memory-mb must be positive".to_string());
        assert!(err.to_string().contains("Invalid argument"));

        let err: CliError = AppError::NotAttached.into();
        assert!(err.to_string().starts_with("Startup failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

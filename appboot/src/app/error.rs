//! Application error types.

use thiserror::Error;

use crate::image::ImageCacheError;
use crate::subsystems::SubsystemError;

/// Errors that abort application startup.
///
/// Only steps of the synchronous startup sequence produce these. Locale and
/// shutdown failures are logged and swallowed; background task failures go
/// to the fault handler.
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to create the Tokio runtime.
    #[error("Failed to create Tokio runtime: {0}")]
    RuntimeCreation(String),

    /// `on_create` was called before `attach_base_context`.
    #[error("Base context has not been attached")]
    NotAttached,

    /// `on_create` was called more than once.
    #[error("Application has already been created")]
    AlreadyCreated,

    #[error("Preference initialization failed: {0}")]
    Preferences(#[source] SubsystemError),

    #[error("Subsystem initialization failed: {0}")]
    Subsystems(#[source] SubsystemError),

    #[error("Failed to build image loader: {0}")]
    ImageLoader(#[from] ImageCacheError),
}

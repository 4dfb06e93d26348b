//! Host platform facade.
//!
//! The [`Platform`] trait is the seam between the bootstrap core and the
//! operating system's locale and configuration APIs. Which of its methods the
//! core calls depends on the [`CapabilityTier`](crate::locale::CapabilityTier)
//! resolved from [`Platform::api_level`].

use thiserror::Error;

use crate::context::{Configuration, ProcessContext};
use crate::locale::{Locale, LocaleList};

/// Errors raised by host platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Deriving a configuration context failed.
    #[error("Configuration context could not be created: {0}")]
    ContextCreation(String),

    /// The host rejected a configuration update.
    #[error("Configuration update rejected: {0}")]
    ConfigurationUpdate(String),

    /// The API is not available on this host.
    #[error("Locale API unavailable on API level {0}")]
    Unsupported(u32),

    /// Any other host failure.
    #[error("Platform error: {0}")]
    Other(String),
}

/// Operating system facade consumed by the locale state machine.
///
/// Implementations must be `Send + Sync`; the bootstrap holds them in an
/// `Arc` for the whole process lifetime.
pub trait Platform: Send + Sync {
    /// Host API level used to resolve the capability tier.
    fn api_level(&self) -> u32;

    /// Current process-wide default locale.
    fn default_locale(&self) -> Locale;

    /// Set the process-wide default locale (all tiers).
    fn set_default_locale(&self, locale: &Locale) -> Result<(), PlatformError>;

    /// Set the process-wide default locale list (list-capable tiers).
    fn set_default_locale_list(&self, locales: &LocaleList) -> Result<(), PlatformError>;

    /// Locales set through the application-compatibility override, if any.
    fn application_locales(&self) -> Option<LocaleList>;

    /// Apply the application-compatibility locale override (newest tier).
    fn set_application_locales(&self, locales: &LocaleList) -> Result<(), PlatformError>;

    /// Derive a context carrying `configuration` from `base`.
    fn create_configuration_context(
        &self,
        base: &ProcessContext,
        configuration: Configuration,
    ) -> Result<ProcessContext, PlatformError> {
        Ok(base.with_configuration(configuration))
    }

    /// Push `configuration` into the process resources behind `context`.
    fn update_configuration(
        &self,
        context: &ProcessContext,
        configuration: Configuration,
    ) -> Result<(), PlatformError> {
        context.replace_configuration(configuration);
        Ok(())
    }

    /// Notify the process that its configuration changed.
    fn notify_configuration_changed(
        &self,
        _configuration: &Configuration,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    /// The locale the process effectively runs with.
    ///
    /// The application override wins when set; otherwise the default locale.
    fn effective_locale(&self) -> Locale {
        self.application_locales()
            .and_then(|locales| locales.primary().cloned())
            .unwrap_or_else(|| self.default_locale())
    }
}

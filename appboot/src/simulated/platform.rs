//! In-memory host platform.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::context::{Configuration, ProcessContext};
use crate::locale::{Locale, LocaleList, API_LOCALE_LIST, API_PER_APP_LOCALES};
use crate::platform::{Platform, PlatformError};

/// Host operations that can be observed and made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformOp {
    SetDefaultLocale,
    SetDefaultLocaleList,
    SetApplicationLocales,
    CreateConfigurationContext,
    UpdateConfiguration,
    NotifyConfigurationChanged,
}

#[derive(Debug)]
struct PlatformState {
    default_locale: Locale,
    default_locale_list: Option<LocaleList>,
    application_locales: Option<LocaleList>,
    failing: HashSet<PlatformOp>,
    panicking: HashSet<PlatformOp>,
    calls: Vec<PlatformOp>,
}

/// Simulated host honouring API level limits.
///
/// List APIs fail with [`PlatformError::Unsupported`] below
/// [`API_LOCALE_LIST`], and the application override below
/// [`API_PER_APP_LOCALES`], so a wrong tier branch shows up as an error.
#[derive(Debug)]
pub struct SimulatedPlatform {
    api_level: u32,
    state: Mutex<PlatformState>,
    notifications: AtomicUsize,
}

impl SimulatedPlatform {
    /// Create a host at `api_level` whose default locale is `en-US`.
    pub fn new(api_level: u32) -> Self {
        Self {
            api_level,
            state: Mutex::new(PlatformState {
                default_locale: Locale::new("en", Some("US")),
                default_locale_list: None,
                application_locales: None,
                failing: HashSet::new(),
                panicking: HashSet::new(),
                calls: Vec::new(),
            }),
            notifications: AtomicUsize::new(0),
        }
    }

    /// Set the initial default locale (builder style).
    pub fn with_default_locale(self, locale: Locale) -> Self {
        self.state.lock().default_locale = locale;
        self
    }

    /// Make every later call of `op` fail.
    pub fn fail(&self, op: PlatformOp) {
        self.state.lock().failing.insert(op);
    }

    /// Make every later call of `op` panic.
    pub fn panic_on(&self, op: PlatformOp) {
        self.state.lock().panicking.insert(op);
    }

    /// Operations invoked so far, in order.
    pub fn calls(&self) -> Vec<PlatformOp> {
        self.state.lock().calls.clone()
    }

    /// Number of configuration change notifications received.
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn default_locale_list(&self) -> Option<LocaleList> {
        self.state.lock().default_locale_list.clone()
    }

    fn record(&self, op: PlatformOp) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(op);
        if state.panicking.contains(&op) {
            drop(state);
            panic!("injected panic in {:?}", op);
        }
        if state.failing.contains(&op) {
            return Err(PlatformError::Other(format!("injected failure in {:?}", op)));
        }
        Ok(())
    }
}

impl Platform for SimulatedPlatform {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn default_locale(&self) -> Locale {
        self.state.lock().default_locale.clone()
    }

    fn set_default_locale(&self, locale: &Locale) -> Result<(), PlatformError> {
        self.record(PlatformOp::SetDefaultLocale)?;
        let mut state = self.state.lock();
        state.default_locale = locale.clone();
        state.default_locale_list = None;
        Ok(())
    }

    fn set_default_locale_list(&self, locales: &LocaleList) -> Result<(), PlatformError> {
        self.record(PlatformOp::SetDefaultLocaleList)?;
        if self.api_level < API_LOCALE_LIST {
            return Err(PlatformError::Unsupported(self.api_level));
        }
        let mut state = self.state.lock();
        if let Some(primary) = locales.primary() {
            state.default_locale = primary.clone();
        }
        state.default_locale_list = Some(locales.clone());
        Ok(())
    }

    fn application_locales(&self) -> Option<LocaleList> {
        self.state.lock().application_locales.clone()
    }

    fn set_application_locales(&self, locales: &LocaleList) -> Result<(), PlatformError> {
        self.record(PlatformOp::SetApplicationLocales)?;
        if self.api_level < API_PER_APP_LOCALES {
            return Err(PlatformError::Unsupported(self.api_level));
        }
        self.state.lock().application_locales = Some(locales.clone());
        Ok(())
    }

    fn create_configuration_context(
        &self,
        base: &ProcessContext,
        configuration: Configuration,
    ) -> Result<ProcessContext, PlatformError> {
        self.record(PlatformOp::CreateConfigurationContext)
            .map_err(|e| PlatformError::ContextCreation(e.to_string()))?;
        Ok(base.with_configuration(configuration))
    }

    fn update_configuration(
        &self,
        context: &ProcessContext,
        configuration: Configuration,
    ) -> Result<(), PlatformError> {
        self.record(PlatformOp::UpdateConfiguration)
            .map_err(|e| PlatformError::ConfigurationUpdate(e.to_string()))?;
        context.replace_configuration(configuration);
        Ok(())
    }

    fn notify_configuration_changed(
        &self,
        _configuration: &Configuration,
    ) -> Result<(), PlatformError> {
        self.record(PlatformOp::NotifyConfigurationChanged)?;
        self.notifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales(tag: &str) -> LocaleList {
        LocaleList::single(tag.parse().unwrap())
    }

    #[test]
    fn test_list_api_unsupported_on_legacy_host() {
        let platform = SimulatedPlatform::new(21);
        let result = platform.set_default_locale_list(&locales("fr-FR"));
        assert!(matches!(result, Err(PlatformError::Unsupported(21))));
    }

    #[test]
    fn test_override_unsupported_below_newest_tier() {
        let platform = SimulatedPlatform::new(30);
        let result = platform.set_application_locales(&locales("fr-FR"));
        assert!(matches!(result, Err(PlatformError::Unsupported(30))));
        assert_eq!(platform.application_locales(), None);
    }

    #[test]
    fn test_effective_locale_prefers_override() {
        let platform = SimulatedPlatform::new(34);
        platform.set_application_locales(&locales("ko-KR")).unwrap();
        assert_eq!(platform.effective_locale(), "ko-KR".parse().unwrap());
        assert_eq!(platform.default_locale(), "en-US".parse().unwrap());
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let platform = SimulatedPlatform::new(28);
        platform.fail(PlatformOp::SetDefaultLocale);

        assert!(platform.set_default_locale(&"de-DE".parse().unwrap()).is_err());
        assert_eq!(platform.calls(), vec![PlatformOp::SetDefaultLocale]);
        assert_eq!(platform.default_locale(), "en-US".parse().unwrap());
    }
}

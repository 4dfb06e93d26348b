//! Locale configurator.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use super::plan::{plan, LocaleAction};
use super::tier::{CapabilityTier, LifecyclePhase};
use super::types::{Locale, LocaleTarget};
use crate::context::ProcessContext;
use crate::fault::panic_message;
use crate::platform::{Platform, PlatformError};

/// Errors raised while applying a locale pass.
#[derive(Debug, Error)]
pub enum LocaleError {
    /// A host operation failed part-way through a pass.
    #[error("Locale action {action:?} failed during {phase:?} pass: {source}")]
    Action {
        phase: LifecyclePhase,
        action: LocaleAction,
        #[source]
        source: PlatformError,
    },

    /// A host operation panicked; the pass was abandoned.
    #[error("Locale {phase:?} pass panicked: {message}")]
    Panicked {
        phase: LifecyclePhase,
        message: String,
    },
}

/// Progress of the locale state machine for this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocaleState {
    /// No pass has completed.
    Unset,
    /// The pre-attach pass completed.
    PreAttachApplied,
    /// The post-attach pass completed. Terminal.
    PostAttachApplied,
}

impl LocaleState {
    fn after(self, phase: LifecyclePhase) -> Self {
        match (self, phase) {
            (LocaleState::PostAttachApplied, _) => LocaleState::PostAttachApplied,
            (_, LifecyclePhase::PreAttach) => LocaleState::PreAttachApplied,
            (_, LifecyclePhase::PostAttach) => LocaleState::PostAttachApplied,
        }
    }
}

/// Result of a successful pass.
#[derive(Debug)]
pub struct LocaleApplication {
    pub phase: LifecyclePhase,
    pub tier: CapabilityTier,
    /// Actions that were executed, in order.
    pub actions: &'static [LocaleAction],
    /// Context to use from here on. For the pre-attach pass this is the
    /// derived context; otherwise the context the pass was given.
    pub context: ProcessContext,
}

/// Applies the [`LocaleTarget`] to the process in both lifecycle phases.
pub struct LocaleConfigurator {
    target: LocaleTarget,
    tier: CapabilityTier,
    platform: Arc<dyn Platform>,
    state: Mutex<LocaleState>,
}

impl LocaleConfigurator {
    /// Create a configurator for a tier resolved by the caller.
    pub fn new(target: LocaleTarget, tier: CapabilityTier, platform: Arc<dyn Platform>) -> Self {
        Self {
            target,
            tier,
            platform,
            state: Mutex::new(LocaleState::Unset),
        }
    }

    pub fn target(&self) -> &LocaleTarget {
        &self.target
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn state(&self) -> LocaleState {
        *self.state.lock()
    }

    /// The locale the process effectively runs with right now.
    pub fn current_locale(&self) -> Locale {
        self.platform.effective_locale()
    }

    /// Pre-attach pass: derive a context carrying the target locale.
    ///
    /// On error the caller should keep using `base` unchanged.
    pub fn attach_base_context(
        &self,
        base: &ProcessContext,
    ) -> Result<LocaleApplication, LocaleError> {
        self.apply(LifecyclePhase::PreAttach, base)
    }

    /// Post-attach pass: re-apply the target to process-wide locale state.
    pub fn initialize_app_language(
        &self,
        context: &ProcessContext,
    ) -> Result<LocaleApplication, LocaleError> {
        self.apply(LifecyclePhase::PostAttach, context)
    }

    fn apply(
        &self,
        phase: LifecyclePhase,
        context: &ProcessContext,
    ) -> Result<LocaleApplication, LocaleError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_actions(phase, context))) {
            Ok(result) => result,
            Err(payload) => Err(LocaleError::Panicked {
                phase,
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn run_actions(
        &self,
        phase: LifecyclePhase,
        context: &ProcessContext,
    ) -> Result<LocaleApplication, LocaleError> {
        let actions = plan(self.tier, phase);
        debug!(
            tier = self.tier.name(),
            ?phase,
            target = %self.target,
            ?actions,
            "Applying locale pass"
        );

        let primary = self.target.locale();
        let locales = self.target.locale_list();
        let mut configuration = context.configuration();
        let mut current = context.clone();

        for &action in actions {
            let result = match action {
                LocaleAction::SetDefaultLocale => self.platform.set_default_locale(primary),
                LocaleAction::SetDefaultLocaleList => {
                    self.platform.set_default_locale_list(&locales)
                }
                LocaleAction::SetConfigLocaleList => {
                    configuration.locales = locales.clone();
                    Ok(())
                }
                LocaleAction::SetConfigLegacyLocale => {
                    configuration.legacy_locale = Some(primary.clone());
                    Ok(())
                }
                LocaleAction::DeriveContext => self
                    .platform
                    .create_configuration_context(&current, configuration.clone())
                    .map(|derived| current = derived),
                LocaleAction::UpdateConfiguration => self
                    .platform
                    .update_configuration(&current, configuration.clone()),
                LocaleAction::NotifyConfigurationChanged => {
                    self.platform.notify_configuration_changed(&configuration)
                }
                LocaleAction::OverrideApplicationLocales => {
                    self.platform.set_application_locales(&locales)
                }
            };
            result.map_err(|source| LocaleError::Action {
                phase,
                action,
                source,
            })?;
        }

        let mut state = self.state.lock();
        *state = state.after(phase);

        info!(
            tier = self.tier.name(),
            ?phase,
            locale = %self.platform.effective_locale(),
            "Locale pass applied"
        );

        Ok(LocaleApplication {
            phase,
            tier: self.tier,
            actions,
            context: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Configuration;
    use crate::simulated::{PlatformOp, SimulatedPlatform};

    fn target() -> LocaleTarget {
        LocaleTarget::parse("zh-CN").unwrap()
    }

    fn base_context() -> ProcessContext {
        ProcessContext::new("com.example.assistant", "/data/app", 1 << 30)
            .with_initial_configuration(Configuration::with_locale("en-US".parse().unwrap()))
    }

    fn configurator(api_level: u32) -> (Arc<SimulatedPlatform>, LocaleConfigurator) {
        let platform = Arc::new(SimulatedPlatform::new(api_level));
        let tier = CapabilityTier::from_api_level(api_level);
        let configurator = LocaleConfigurator::new(target(), tier, platform.clone());
        (platform, configurator)
    }

    #[test]
    fn test_both_passes_converge_on_every_tier() {
        for api_level in [21, 28, 34] {
            let (_platform, configurator) = configurator(api_level);
            let base = base_context();

            let attached = configurator.attach_base_context(&base).unwrap();
            configurator
                .initialize_app_language(&attached.context)
                .unwrap();

            assert_eq!(configurator.current_locale(), *target().locale());
            assert_eq!(
                attached.context.configuration().primary_locale(),
                Some(target().locale())
            );
            assert_eq!(configurator.state(), LocaleState::PostAttachApplied);
        }
    }

    #[test]
    fn test_pre_attach_derives_new_context() {
        let (_platform, configurator) = configurator(28);
        let base = base_context();

        let attached = configurator.attach_base_context(&base).unwrap();

        assert!(!attached.context.same_handle(&base));
        // The base context keeps its original configuration.
        assert_eq!(
            base.configuration().primary_locale(),
            Some(&"en-US".parse().unwrap())
        );
        assert_eq!(configurator.state(), LocaleState::PreAttachApplied);
    }

    #[test]
    fn test_legacy_pre_attach_only_sets_legacy_field() {
        let (platform, configurator) = configurator(21);
        let attached = configurator.attach_base_context(&base_context()).unwrap();

        assert_eq!(
            attached.context.configuration().legacy_locale,
            Some(target().locale().clone())
        );
        assert!(!platform.calls().contains(&PlatformOp::SetDefaultLocaleList));
    }

    #[test]
    fn test_legacy_post_attach_updates_and_notifies() {
        let (platform, configurator) = configurator(21);
        let ctx = base_context();

        let applied = configurator.initialize_app_language(&ctx).unwrap();

        assert!(applied.context.same_handle(&ctx));
        assert_eq!(platform.notifications(), 1);
        assert!(platform.calls().contains(&PlatformOp::UpdateConfiguration));
        assert_eq!(ctx.configuration().legacy_locale, Some(target().locale().clone()));
    }

    #[test]
    fn test_newest_tier_post_attach_uses_override() {
        let (platform, configurator) = configurator(34);
        let ctx = base_context();

        configurator.initialize_app_language(&ctx).unwrap();

        assert_eq!(platform.application_locales(), Some(target().locale_list()));
        assert!(!platform.calls().contains(&PlatformOp::UpdateConfiguration));
        // Configuration is left to the override API.
        assert_eq!(
            ctx.configuration().primary_locale(),
            Some(&"en-US".parse().unwrap())
        );
    }

    #[test]
    fn test_failure_reports_action_and_keeps_state() {
        let (platform, configurator) = configurator(28);
        platform.fail(PlatformOp::CreateConfigurationContext);

        let err = configurator.attach_base_context(&base_context()).unwrap_err();

        assert!(matches!(
            err,
            LocaleError::Action {
                phase: LifecyclePhase::PreAttach,
                action: LocaleAction::DeriveContext,
                ..
            }
        ));
        assert_eq!(configurator.state(), LocaleState::Unset);
    }

    #[test]
    fn test_platform_panic_becomes_error() {
        let (platform, configurator) = configurator(34);
        platform.panic_on(PlatformOp::SetApplicationLocales);

        let err = configurator
            .initialize_app_language(&base_context())
            .unwrap_err();

        match err {
            LocaleError::Panicked { phase, message } => {
                assert_eq!(phase, LifecyclePhase::PostAttach);
                assert!(message.contains("SetApplicationLocales"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(configurator.state(), LocaleState::Unset);

        // The state lock is not held across the panic.
        configurator.attach_base_context(&base_context()).unwrap();
        assert_eq!(configurator.state(), LocaleState::PreAttachApplied);
    }

    #[test]
    fn test_passes_are_idempotent() {
        for api_level in [21, 28, 34] {
            let (_platform, configurator) = configurator(api_level);
            let base = base_context();

            let once = configurator.attach_base_context(&base).unwrap();
            let twice = configurator.attach_base_context(&once.context).unwrap();
            assert_eq!(once.context.configuration(), twice.context.configuration());

            configurator.initialize_app_language(&twice.context).unwrap();
            let after_once = configurator.current_locale();
            configurator.initialize_app_language(&twice.context).unwrap();
            assert_eq!(configurator.current_locale(), after_once);
        }
    }

    #[test]
    fn test_pre_attach_after_post_attach_keeps_terminal_state() {
        let (_platform, configurator) = configurator(28);
        let ctx = base_context();

        configurator.initialize_app_language(&ctx).unwrap();
        configurator.attach_base_context(&ctx).unwrap();

        assert_eq!(configurator.state(), LocaleState::PostAttachApplied);
    }
}

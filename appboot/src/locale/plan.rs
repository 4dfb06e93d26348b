//! Locale action table.
//!
//! Maps `(CapabilityTier, LifecyclePhase)` to the ordered list of actions a
//! pass performs. Pure data; execution and error handling live in the
//! configurator.

use super::tier::{CapabilityTier, LifecyclePhase};

/// One concrete configuration step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocaleAction {
    /// Set the process default to the target locale.
    SetDefaultLocale,
    /// Set the process default locale list to the target list.
    SetDefaultLocaleList,
    /// Write the target list into the working configuration.
    SetConfigLocaleList,
    /// Write the target into the working configuration's legacy field.
    SetConfigLegacyLocale,
    /// Derive a new context from the working configuration.
    DeriveContext,
    /// Push the working configuration into the process resources.
    UpdateConfiguration,
    /// Notify the process of the configuration change.
    NotifyConfigurationChanged,
    /// Defer to the application-compatibility locale override.
    OverrideApplicationLocales,
}

use LocaleAction::*;

const PRE_ATTACH_LEGACY: &[LocaleAction] = &[SetConfigLegacyLocale, DeriveContext];

const PRE_ATTACH_LIST: &[LocaleAction] =
    &[SetDefaultLocaleList, SetConfigLocaleList, DeriveContext];

const POST_ATTACH_LEGACY: &[LocaleAction] = &[
    SetDefaultLocale,
    SetConfigLegacyLocale,
    UpdateConfiguration,
    NotifyConfigurationChanged,
];

const POST_ATTACH_LIST: &[LocaleAction] = &[
    SetDefaultLocaleList,
    SetConfigLocaleList,
    UpdateConfiguration,
    NotifyConfigurationChanged,
];

const POST_ATTACH_OVERRIDE: &[LocaleAction] = &[OverrideApplicationLocales];

/// Indexed by `[tier][phase]`.
const PLANS: [[&[LocaleAction]; 2]; 3] = [
    [PRE_ATTACH_LEGACY, POST_ATTACH_LEGACY],
    [PRE_ATTACH_LIST, POST_ATTACH_LIST],
    [PRE_ATTACH_LIST, POST_ATTACH_OVERRIDE],
];

/// Actions a locale pass performs for the given tier and phase.
pub fn plan(tier: CapabilityTier, phase: LifecyclePhase) -> &'static [LocaleAction] {
    PLANS[tier.index()][phase.index()]
}

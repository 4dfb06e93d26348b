//! Host capability tiers and lifecycle phases.

/// First API level with locale list support.
pub const API_LOCALE_LIST: u32 = 24;

/// First API level with the per-application locale override.
pub const API_PER_APP_LOCALES: u32 = 33;

/// Discrete host version band deciding which locale API is used.
///
/// Resolved once at startup from [`Platform::api_level`](crate::platform::Platform::api_level).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityTier {
    /// Single locale field only.
    Legacy,
    /// Locale lists, no application override.
    LocaleList,
    /// Locale lists plus the application-compatibility override.
    PerAppLocales,
}

impl CapabilityTier {
    /// All tiers, oldest first.
    pub const ALL: [CapabilityTier; 3] = [
        CapabilityTier::Legacy,
        CapabilityTier::LocaleList,
        CapabilityTier::PerAppLocales,
    ];

    /// Resolve the tier for a host API level.
    pub fn from_api_level(api_level: u32) -> Self {
        if api_level >= API_PER_APP_LOCALES {
            CapabilityTier::PerAppLocales
        } else if api_level >= API_LOCALE_LIST {
            CapabilityTier::LocaleList
        } else {
            CapabilityTier::Legacy
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            CapabilityTier::Legacy => 0,
            CapabilityTier::LocaleList => 1,
            CapabilityTier::PerAppLocales => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CapabilityTier::Legacy => "legacy",
            CapabilityTier::LocaleList => "locale-list",
            CapabilityTier::PerAppLocales => "per-app-locales",
        }
    }
}

/// Lifecycle phase a locale pass runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Before the base context is finalized.
    PreAttach,
    /// During main startup.
    PostAttach,
}

impl LifecyclePhase {
    pub(crate) fn index(self) -> usize {
        match self {
            LifecyclePhase::PreAttach => 0,
            LifecyclePhase::PostAttach => 1,
        }
    }
}

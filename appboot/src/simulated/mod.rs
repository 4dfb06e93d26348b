//! In-memory host for running the lifecycle off-device.
//!
//! [`SimulatedHost`] wires a recording implementation of every external
//! subsystem, with per-subsystem fault injection selected by [`Injection`].
//! The CLI `simulate` command and the test suites drive the bootstrap through
//! it.
//!
//! # Example
//!
//! ```ignore
//! use appboot::simulated::{Injection, SimulatedHost, SimulatedPlatform};
//!
//! let host = SimulatedHost::with_injections([Injection::SegmenterPanic]);
//! let platform = Arc::new(SimulatedPlatform::new(34));
//! let mut app = AssistantApp::new(config, platform, host.collaborators());
//! ```

mod collaborators;
mod platform;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::subsystems::Collaborators;

pub use collaborators::{
    Behavior, SimulatedDatabase, SimulatedDatabaseFactory, SimulatedImageCache,
    SimulatedPreferences, SimulatedResources, SimulatedSegmenter, SimulatedShell,
    SimulatedWebServer, SimulatedWebServerProvider, CONTENT_CACHE_DIR_NAME, RESOURCES_DIR_NAME,
};
pub use platform::{PlatformOp, SimulatedPlatform};

/// A fault to inject into one simulated subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Injection {
    GeneralPreferencesFail,
    PermissionPreferencesFail,
    ShellFail,
    ResourceLoaderFail,
    ImageCacheFail,
    SegmenterFail,
    SegmenterPanic,
    DatabaseFail,
    DatabasePanic,
    WebServerLookupFail,
    WebServerStopFail,
}

impl Injection {
    pub const ALL: [Injection; 11] = [
        Injection::GeneralPreferencesFail,
        Injection::PermissionPreferencesFail,
        Injection::ShellFail,
        Injection::ResourceLoaderFail,
        Injection::ImageCacheFail,
        Injection::SegmenterFail,
        Injection::SegmenterPanic,
        Injection::DatabaseFail,
        Injection::DatabasePanic,
        Injection::WebServerLookupFail,
        Injection::WebServerStopFail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Injection::GeneralPreferencesFail => "general-preferences-fail",
            Injection::PermissionPreferencesFail => "permission-preferences-fail",
            Injection::ShellFail => "shell-fail",
            Injection::ResourceLoaderFail => "resource-loader-fail",
            Injection::ImageCacheFail => "image-cache-fail",
            Injection::SegmenterFail => "segmenter-fail",
            Injection::SegmenterPanic => "segmenter-panic",
            Injection::DatabaseFail => "database-fail",
            Injection::DatabasePanic => "database-panic",
            Injection::WebServerLookupFail => "web-server-lookup-fail",
            Injection::WebServerStopFail => "web-server-stop-fail",
        }
    }
}

impl fmt::Display for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Injection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Injection::ALL
            .into_iter()
            .find(|injection| injection.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Injection::ALL.iter().map(|i| i.name()).collect();
                format!("unknown injection '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Every simulated collaborator, kept accessible for inspection.
pub struct SimulatedHost {
    pub general_preferences: Arc<SimulatedPreferences>,
    pub permission_preferences: Arc<SimulatedPreferences>,
    pub shell: Arc<SimulatedShell>,
    pub resources: Arc<SimulatedResources>,
    pub image_cache: Arc<SimulatedImageCache>,
    pub segmenter: Arc<SimulatedSegmenter>,
    pub database: Arc<SimulatedDatabaseFactory>,
    pub web_server: Arc<SimulatedWebServer>,
    pub web_server_provider: Arc<SimulatedWebServerProvider>,
}

impl SimulatedHost {
    /// A host where everything succeeds.
    pub fn new() -> Self {
        Self::with_injections([])
    }

    pub fn with_injections(injections: impl IntoIterator<Item = Injection>) -> Self {
        Self::build(injections.into_iter().collect(), Duration::ZERO, Duration::ZERO)
    }

    /// Like [`with_injections`](Self::with_injections), with artificial
    /// latency for the two warm-up subsystems.
    pub fn with_latency(
        injections: impl IntoIterator<Item = Injection>,
        segmenter_delay: Duration,
        database_delay: Duration,
    ) -> Self {
        Self::build(
            injections.into_iter().collect(),
            segmenter_delay,
            database_delay,
        )
    }

    fn build(
        injections: HashSet<Injection>,
        segmenter_delay: Duration,
        database_delay: Duration,
    ) -> Self {
        let has = |injection: Injection| injections.contains(&injection);

        let segmenter_behavior = if has(Injection::SegmenterPanic) {
            Behavior::Panic
        } else if has(Injection::SegmenterFail) {
            Behavior::Fail
        } else {
            Behavior::Succeed
        };
        let database_behavior = if has(Injection::DatabasePanic) {
            Behavior::Panic
        } else if has(Injection::DatabaseFail) {
            Behavior::Fail
        } else {
            Behavior::Succeed
        };

        let web_server = Arc::new(SimulatedWebServer::new(has(Injection::WebServerStopFail)));
        let web_server_provider = Arc::new(SimulatedWebServerProvider::new(
            web_server.clone(),
            has(Injection::WebServerLookupFail),
        ));

        Self {
            general_preferences: Arc::new(SimulatedPreferences::new(
                "general preferences",
                has(Injection::GeneralPreferencesFail),
            )),
            permission_preferences: Arc::new(SimulatedPreferences::new(
                "permission preferences",
                has(Injection::PermissionPreferencesFail),
            )),
            shell: Arc::new(SimulatedShell::new(has(Injection::ShellFail))),
            resources: Arc::new(SimulatedResources::new(has(Injection::ResourceLoaderFail))),
            image_cache: Arc::new(SimulatedImageCache::new(has(Injection::ImageCacheFail))),
            segmenter: Arc::new(
                SimulatedSegmenter::new(segmenter_behavior).with_delay(segmenter_delay),
            ),
            database: Arc::new(
                SimulatedDatabaseFactory::with_behavior(database_behavior)
                    .with_delay(database_delay),
            ),
            web_server,
            web_server_provider,
        }
    }

    /// Trait-object bundle for the bootstrap.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            general_preferences: self.general_preferences.clone(),
            permission_preferences: self.permission_preferences.clone(),
            shell: self.shell.clone(),
            resources: self.resources.clone(),
            image_cache: self.image_cache.clone(),
            text_segmenter: self.segmenter.clone(),
            database: self.database.clone(),
            web_server: self.web_server_provider.clone(),
        }
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injection_names_round_trip() {
        for injection in Injection::ALL {
            assert_eq!(injection.name().parse::<Injection>(), Ok(injection));
        }
    }

    #[test]
    fn test_unknown_injection_lists_choices() {
        let err = "explode".parse::<Injection>().unwrap_err();
        assert!(err.contains("explode"));
        assert!(err.contains("segmenter-panic"));
    }

    #[test]
    fn test_host_applies_injections() {
        let host = SimulatedHost::with_injections([Injection::WebServerLookupFail]);
        let ctx = crate::context::ProcessContext::new("pkg", "/data", 0);
        let collaborators = host.collaborators();

        assert!(collaborators.web_server.get_instance(&ctx).is_err());
        assert_eq!(host.web_server_provider.lookup_count(), 1);
    }
}

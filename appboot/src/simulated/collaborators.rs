//! Recording collaborator implementations with fault injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::debug;

use crate::context::ProcessContext;
use crate::subsystems::{
    BoxFuture, Database, DatabaseError, DatabaseFactory, ImageCache, LocalWebServer,
    PreferenceStore, ResourceLoader, ShellExecutor, SubsystemError, TextSegmenter,
    WebServerProvider,
};

/// Directory primed by [`SimulatedResources`] under the files dir.
pub const RESOURCES_DIR_NAME: &str = "resources";

/// Directory primed by [`SimulatedImageCache`] under the cache dir.
pub const CONTENT_CACHE_DIR_NAME: &str = "content_cache";

// =============================================================================
// Preferences
// =============================================================================

/// Preference store counting its initializations.
#[derive(Debug)]
pub struct SimulatedPreferences {
    name: &'static str,
    fail: bool,
    initialized: AtomicBool,
    inits: AtomicUsize,
}

impl SimulatedPreferences {
    pub fn new(name: &'static str, fail: bool) -> Self {
        Self {
            name,
            fail,
            initialized: AtomicBool::new(false),
            inits: AtomicUsize::new(0),
        }
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl PreferenceStore for SimulatedPreferences {
    fn init(&self, _context: &ProcessContext) -> Result<(), SubsystemError> {
        if self.fail {
            return Err(SubsystemError::init(self.name, "injected failure"));
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Synchronous initializers
// =============================================================================

/// Command executor remembering the package it was bound to.
#[derive(Debug)]
pub struct SimulatedShell {
    fail: bool,
    bound_to: OnceLock<String>,
}

impl SimulatedShell {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            bound_to: OnceLock::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound_to.get().is_some()
    }

    pub fn bound_package(&self) -> Option<&str> {
        self.bound_to.get().map(String::as_str)
    }
}

impl ShellExecutor for SimulatedShell {
    fn set_context(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        if self.fail {
            return Err(SubsystemError::init("shell executor", "injected failure"));
        }
        let _ = self.bound_to.set(context.package_name().to_string());
        Ok(())
    }
}

/// Resource loader that creates its directory under the files dir.
#[derive(Debug)]
pub struct SimulatedResources {
    fail: bool,
    primed: AtomicBool,
}

impl SimulatedResources {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            primed: AtomicBool::new(false),
        }
    }

    pub fn is_primed(&self) -> bool {
        self.primed.load(Ordering::SeqCst)
    }
}

impl ResourceLoader for SimulatedResources {
    fn init(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        if self.fail {
            return Err(SubsystemError::init("resource loader", "injected failure"));
        }
        std::fs::create_dir_all(context.files_dir().join(RESOURCES_DIR_NAME))?;
        self.primed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Content-addressed cache that creates its directory under the cache dir.
#[derive(Debug)]
pub struct SimulatedImageCache {
    fail: bool,
    primed: AtomicBool,
}

impl SimulatedImageCache {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            primed: AtomicBool::new(false),
        }
    }

    pub fn is_primed(&self) -> bool {
        self.primed.load(Ordering::SeqCst)
    }
}

impl ImageCache for SimulatedImageCache {
    fn initialize(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        if self.fail {
            return Err(SubsystemError::init("image cache", "injected failure"));
        }
        std::fs::create_dir_all(context.cache_dir().join(CONTENT_CACHE_DIR_NAME))?;
        self.primed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Background subsystems
// =============================================================================

/// How a simulated background subsystem behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Text segmenter with configurable latency and behavior.
#[derive(Debug)]
pub struct SimulatedSegmenter {
    behavior: Behavior,
    delay: Duration,
    initialized: AtomicBool,
}

impl SimulatedSegmenter {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

impl TextSegmenter for SimulatedSegmenter {
    fn initialize<'a>(
        &'a self,
        _context: &'a ProcessContext,
    ) -> BoxFuture<'a, Result<(), SubsystemError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.behavior {
                Behavior::Succeed => {
                    self.initialized.store(true, Ordering::SeqCst);
                    debug!("Simulated text segmenter ready");
                    Ok(())
                }
                Behavior::Fail => Err(SubsystemError::init("text segmenter", "injected failure")),
                Behavior::Panic => panic!("injected text segmenter panic"),
            }
        })
    }
}

/// Database handle reporting a fixed problem count.
#[derive(Debug)]
pub struct SimulatedDatabase {
    problems: u64,
    queries: AtomicUsize,
}

impl SimulatedDatabase {
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Database for SimulatedDatabase {
    fn problem_count(&self) -> Result<u64, DatabaseError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.problems)
    }
}

/// Database factory counting opens; `open` blocks for the configured delay.
#[derive(Debug)]
pub struct SimulatedDatabaseFactory {
    behavior: Behavior,
    delay: Duration,
    opens: AtomicUsize,
}

impl SimulatedDatabaseFactory {
    pub fn new(fail: bool) -> Self {
        Self::with_behavior(if fail { Behavior::Fail } else { Behavior::Succeed })
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times `open` was entered.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DatabaseFactory for SimulatedDatabaseFactory {
    fn open(&self, _context: &ProcessContext) -> Result<Arc<dyn Database>, DatabaseError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match self.behavior {
            Behavior::Succeed => Ok(Arc::new(SimulatedDatabase {
                problems: 0,
                queries: AtomicUsize::new(0),
            })),
            Behavior::Fail => Err(DatabaseError::Open("injected failure".to_string())),
            Behavior::Panic => panic!("injected database panic"),
        }
    }
}

// =============================================================================
// Local web server
// =============================================================================

/// Web server that only tracks whether it is running.
#[derive(Debug)]
pub struct SimulatedWebServer {
    fail_stop: bool,
    running: AtomicBool,
    stops: AtomicUsize,
}

impl SimulatedWebServer {
    pub fn new(fail_stop: bool) -> Self {
        Self {
            fail_stop,
            running: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Number of `stop` calls received.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl LocalWebServer for SimulatedWebServer {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) -> Result<(), SubsystemError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(SubsystemError::Stop {
                subsystem: "local web server",
                reason: "injected failure".to_string(),
            });
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Accessor handing out the shared [`SimulatedWebServer`].
#[derive(Debug)]
pub struct SimulatedWebServerProvider {
    server: Arc<SimulatedWebServer>,
    fail_lookup: bool,
    lookups: AtomicUsize,
}

impl SimulatedWebServerProvider {
    pub fn new(server: Arc<SimulatedWebServer>, fail_lookup: bool) -> Self {
        Self {
            server,
            fail_lookup,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl WebServerProvider for SimulatedWebServerProvider {
    fn get_instance(
        &self,
        _context: &ProcessContext,
    ) -> Result<Arc<dyn LocalWebServer>, SubsystemError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            return Err(SubsystemError::Lookup {
                subsystem: "local web server",
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.server.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_server_stop_clears_running() {
        let server = SimulatedWebServer::new(false);
        server.start();
        assert!(server.is_running());

        server.stop().unwrap();
        assert!(!server.is_running());
        assert_eq!(server.stop_count(), 1);
    }

    #[test]
    fn test_failing_stop_keeps_running() {
        let server = SimulatedWebServer::new(true);
        server.start();
        assert!(server.stop().is_err());
        assert!(server.is_running());
    }

    #[tokio::test]
    async fn test_segmenter_failure_modes() {
        let ctx = ProcessContext::new("pkg", "/data", 0);

        let ok = SimulatedSegmenter::new(Behavior::Succeed);
        ok.initialize(&ctx).await.unwrap();
        assert!(ok.is_initialized());

        let failing = SimulatedSegmenter::new(Behavior::Fail);
        assert!(failing.initialize(&ctx).await.is_err());
        assert!(!failing.is_initialized());
    }
}

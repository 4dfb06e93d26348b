//! Termination hook.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use crate::context::ProcessContext;
use crate::fault::panic_message;
use crate::subsystems::WebServerProvider;

/// What the shutdown hook did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The web server was running and has been stopped.
    Stopped,
    /// The web server was not running; nothing was stopped.
    NotRunning,
    /// Lookup or stop failed; termination proceeded anyway.
    Failed(String),
    /// No context was ever attached, so there was nothing to look up.
    Skipped,
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownOutcome::Stopped => write!(f, "web server stopped"),
            ShutdownOutcome::NotRunning => write!(f, "web server not running"),
            ShutdownOutcome::Failed(reason) => write!(f, "shutdown failed: {}", reason),
            ShutdownOutcome::Skipped => write!(f, "skipped (no context)"),
        }
    }
}

/// Stops the local web server on termination if it is running.
pub struct ShutdownHook {
    web_server: Arc<dyn WebServerProvider>,
}

impl ShutdownHook {
    pub fn new(web_server: Arc<dyn WebServerProvider>) -> Self {
        Self { web_server }
    }

    /// Run the hook. Never fails; errors and panics from the web server are
    /// logged and reported in the outcome.
    pub fn run(&self, context: &ProcessContext) -> ShutdownOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.stop_server(context))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "Web server shutdown panicked");
                ShutdownOutcome::Failed(format!("panicked: {}", message))
            }
        }
    }

    fn stop_server(&self, context: &ProcessContext) -> ShutdownOutcome {
        let server = match self.web_server.get_instance(context) {
            Ok(server) => server,
            Err(e) => {
                warn!(error = %e, "Web server lookup failed during shutdown");
                return ShutdownOutcome::Failed(e.to_string());
            }
        };

        if !server.is_running() {
            info!("Web server not running, nothing to stop");
            return ShutdownOutcome::NotRunning;
        }

        match server.stop() {
            Ok(()) => {
                info!("Web server stopped");
                ShutdownOutcome::Stopped
            }
            Err(e) => {
                warn!(error = %e, "Failed to stop web server");
                ShutdownOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{SimulatedWebServer, SimulatedWebServerProvider};
    use crate::subsystems::{LocalWebServer, SubsystemError};

    struct PanickingServer;

    impl LocalWebServer for PanickingServer {
        fn is_running(&self) -> bool {
            true
        }

        fn stop(&self) -> Result<(), SubsystemError> {
            panic!("socket close panicked")
        }
    }

    struct PanickingProvider {
        panic_on_lookup: bool,
    }

    impl WebServerProvider for PanickingProvider {
        fn get_instance(
            &self,
            _context: &ProcessContext,
        ) -> Result<Arc<dyn LocalWebServer>, SubsystemError> {
            if self.panic_on_lookup {
                panic!("registry poisoned");
            }
            Ok(Arc::new(PanickingServer))
        }
    }

    fn hook(server: &Arc<SimulatedWebServer>, fail_lookup: bool) -> ShutdownHook {
        ShutdownHook::new(Arc::new(SimulatedWebServerProvider::new(
            Arc::clone(server),
            fail_lookup,
        )))
    }

    fn context() -> ProcessContext {
        ProcessContext::new("com.example.shutdown", "/data", 0)
    }

    #[test]
    fn test_never_started_server_is_not_stopped() {
        let server = Arc::new(SimulatedWebServer::new(false));
        let outcome = hook(&server, false).run(&context());

        assert_eq!(outcome, ShutdownOutcome::NotRunning);
        assert_eq!(server.stop_count(), 0);
    }

    #[test]
    fn test_running_server_is_stopped_once() {
        let server = Arc::new(SimulatedWebServer::new(false));
        server.start();
        let hook = hook(&server, false);

        assert_eq!(hook.run(&context()), ShutdownOutcome::Stopped);
        assert_eq!(hook.run(&context()), ShutdownOutcome::NotRunning);
        assert_eq!(server.stop_count(), 1);
    }

    #[test]
    fn test_stop_failure_is_swallowed() {
        let server = Arc::new(SimulatedWebServer::new(true));
        server.start();

        let outcome = hook(&server, false).run(&context());
        assert!(matches!(outcome, ShutdownOutcome::Failed(_)));
    }

    #[test]
    fn test_lookup_failure_is_swallowed() {
        let server = Arc::new(SimulatedWebServer::new(false));
        server.start();

        let outcome = hook(&server, true).run(&context());
        assert!(matches!(outcome, ShutdownOutcome::Failed(_)));
        assert_eq!(server.stop_count(), 0);
    }

    #[test]
    fn test_stop_panic_is_swallowed() {
        let hook = ShutdownHook::new(Arc::new(PanickingProvider {
            panic_on_lookup: false,
        }));

        match hook.run(&context()) {
            ShutdownOutcome::Failed(reason) => assert!(reason.contains("socket close panicked")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_panic_is_swallowed() {
        let hook = ShutdownHook::new(Arc::new(PanickingProvider {
            panic_on_lookup: true,
        }));

        assert!(matches!(hook.run(&context()), ShutdownOutcome::Failed(_)));
    }
}

//! Panic hook installation.

use std::any::Any;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Once};

use parking_lot::RwLock;
use tracing::info;

use super::{FaultHandler, FaultSource};
use crate::context::ProcessContext;

/// Handler the process panic hook forwards to.
static ACTIVE_HANDLER: RwLock<Option<Arc<FaultHandler>>> = parking_lot::const_rwlock(None);

static HOOK: Once = Once::new();

/// Installs a [`FaultHandler`] as the process panic hook.
pub struct ExceptionHandlerInstaller;

impl ExceptionHandlerInstaller {
    /// Create a handler owned by `context` and install it.
    pub fn install(context: &ProcessContext, history: usize) -> Arc<FaultHandler> {
        let handler = Arc::new(FaultHandler::with_capacity(context.package_name(), history));
        Self::install_handler(Arc::clone(&handler));
        handler
    }

    /// Route panics to `handler`.
    ///
    /// The hook itself is registered once per process and chains to the hook
    /// that was active before it; later calls only swap the target handler.
    pub fn install_handler(handler: Arc<FaultHandler>) {
        let owner = handler.owner().to_string();
        *ACTIVE_HANDLER.write() = Some(handler);

        HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                forward_panic(info);
                previous(info);
            }));
        });

        info!(owner = %owner, "Process fault handler installed");
    }

    /// Returns true if `handler` currently receives panics.
    pub fn is_active(handler: &Arc<FaultHandler>) -> bool {
        ACTIVE_HANDLER
            .read()
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, handler))
    }
}

fn forward_panic(info: &PanicHookInfo<'_>) {
    // A panic while the handler slot is being swapped is not reported.
    let Some(guard) = ACTIVE_HANDLER.try_read() else {
        return;
    };
    let Some(handler) = guard.as_ref().map(Arc::clone) else {
        return;
    };
    drop(guard);

    let thread = std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();
    let location = info.location().map(|l| l.to_string());
    handler.report(
        FaultSource::Panic { thread, location },
        panic_message(info.payload()),
    );
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let static_str: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(static_str.as_ref()), "static message");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(owned.as_ref()), "owned message");

        let other: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_installed_handler_records_panics() {
        let ctx = ProcessContext::new("com.example.hooked", "/data", 0);
        let handler = ExceptionHandlerInstaller::install(&ctx, 8);
        assert!(ExceptionHandlerInstaller::is_active(&handler));

        let result = std::thread::Builder::new()
            .name("faulty-worker".to_string())
            .spawn(|| panic!("boom from worker"))
            .unwrap()
            .join();
        assert!(result.is_err());

        let records = handler.records();
        let record = records
            .iter()
            .find(|r| r.message == "boom from worker")
            .expect("panic should be recorded");
        assert_eq!(record.owner, "com.example.hooked");
        assert!(matches!(
            &record.source,
            FaultSource::Panic { thread, location: Some(_) } if thread == "faulty-worker"
        ));
    }
}

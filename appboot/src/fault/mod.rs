//! Process-wide fault handling.
//!
//! [`FaultHandler`] is the diagnostics sink for every fault the bootstrap
//! does not propagate: panics caught by the installed panic hook and failures
//! of supervised background tasks. Each fault is logged through `tracing` and
//! kept in a bounded history for later inspection.
//!
//! [`ExceptionHandlerInstaller`] installs the handler as the process panic
//! hook. It runs before every other startup step so that failures in later
//! steps are still captured.

mod installer;

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::error;

pub use installer::{panic_message, ExceptionHandlerInstaller};

/// Default number of fault records kept.
pub const DEFAULT_FAULT_HISTORY: usize = 64;

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Marks this thread as reporting until dropped, including on unwind.
struct ReportingGuard;

impl ReportingGuard {
    fn enter() -> Option<Self> {
        if REPORTING.with(|flag| flag.replace(true)) {
            None
        } else {
            Some(ReportingGuard)
        }
    }
}

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTING.with(|flag| flag.set(false));
    }
}

/// Where a fault originated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaultSource {
    /// A panic observed by the process panic hook.
    Panic {
        thread: String,
        location: Option<String>,
    },
    /// A supervised background task failed or panicked.
    Task { name: String },
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Panic { thread, location } => match location {
                Some(location) => write!(f, "panic in thread '{}' at {}", thread, location),
                None => write!(f, "panic in thread '{}'", thread),
            },
            FaultSource::Task { name } => write!(f, "background task '{}'", name),
        }
    }
}

/// One recorded fault.
#[derive(Clone, Debug)]
pub struct FaultRecord {
    pub at: DateTime<Utc>,
    /// Owning context (package name).
    pub owner: String,
    pub source: FaultSource,
    pub message: String,
}

/// Logs and records faults for one owning context.
pub struct FaultHandler {
    owner: String,
    capacity: usize,
    records: Mutex<VecDeque<FaultRecord>>,
    total: AtomicU64,
}

impl FaultHandler {
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_capacity(owner, DEFAULT_FAULT_HISTORY)
    }

    /// Create a handler keeping at most `capacity` records (minimum 1).
    pub fn with_capacity(owner: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            owner: owner.into(),
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            total: AtomicU64::new(0),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Log and record a fault.
    ///
    /// A fault raised while this thread is already reporting one is dropped.
    pub fn report(&self, source: FaultSource, message: impl Into<String>) {
        let Some(_guard) = ReportingGuard::enter() else {
            return;
        };

        let message = message.into();
        error!(owner = %self.owner, source = %source, message = %message, "Fault reported");

        self.total.fetch_add(1, Ordering::Relaxed);
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(FaultRecord {
            at: Utc::now(),
            owner: self.owner.clone(),
            source,
            message,
        });
    }

    /// Recorded faults, oldest first.
    pub fn records(&self) -> Vec<FaultRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Faults reported since creation, including ones evicted from history.
    pub fn fault_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for FaultHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultHandler")
            .field("owner", &self.owner)
            .field("capacity", &self.capacity)
            .field("fault_count", &self.fault_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> FaultSource {
        FaultSource::Task {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_report_records_owner_and_source() {
        let handler = FaultHandler::new("com.example.assistant");
        handler.report(task("database-warmup"), "open failed");

        let records = handler.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].owner, "com.example.assistant");
        assert_eq!(records[0].source, task("database-warmup"));
        assert_eq!(records[0].message, "open failed");
    }

    #[test]
    fn test_history_is_bounded() {
        let handler = FaultHandler::with_capacity("pkg", 2);
        for i in 0..5 {
            handler.report(task("t"), format!("fault {}", i));
        }

        let messages: Vec<String> = handler.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["fault 3", "fault 4"]);
        assert_eq!(handler.fault_count(), 5);
    }

    #[test]
    fn test_nested_report_is_dropped() {
        let handler = FaultHandler::new("pkg");
        REPORTING.with(|flag| flag.set(true));
        handler.report(task("t"), "while reporting");
        REPORTING.with(|flag| flag.set(false));

        assert!(handler.records().is_empty());

        handler.report(task("t"), "after");
        assert_eq!(handler.records().len(), 1);
    }

    struct FailingLayer;

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FailingLayer {
        fn on_event(
            &self,
            _event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            panic!("log sink failed");
        }
    }

    #[test]
    fn test_unwinding_report_does_not_silence_thread() {
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use tracing_subscriber::layer::SubscriberExt;

        let handler = FaultHandler::new("pkg");
        let subscriber = tracing_subscriber::registry().with(FailingLayer);
        tracing::subscriber::with_default(subscriber, || {
            let result = catch_unwind(AssertUnwindSafe(|| handler.report(task("t"), "lost")));
            assert!(result.is_err());
        });

        handler.report(task("t"), "after unwind");

        let messages: Vec<String> = handler.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["after unwind"]);
    }

    #[test]
    fn test_fault_source_display() {
        let source = FaultSource::Panic {
            thread: "main".to_string(),
            location: Some("src/app.rs:10:5".to_string()),
        };
        assert_eq!(source.to_string(), "panic in thread 'main' at src/app.rs:10:5");
        assert_eq!(task("warmup").to_string(), "background task 'warmup'");
    }
}

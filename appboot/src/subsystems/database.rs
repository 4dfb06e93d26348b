//! Lazily constructed database handle.
//!
//! The persistent store is opened on first access and shared afterwards.
//! Concurrent first callers (the warm-up task and whichever feature asks
//! first) block on an init lock until construction finishes; the factory is
//! invoked at most once per successful construction. A failed open leaves
//! the handle empty so a later caller may retry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use super::{Database, DatabaseFactory};
use crate::context::ProcessContext;

/// Errors raised by the persistent store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Database query failed: {0}")]
    Query(String),
}

/// Once-only accessor for the shared database handle.
pub struct LazyDatabase {
    context: ProcessContext,
    factory: Arc<dyn DatabaseFactory>,
    handle: OnceLock<Arc<dyn Database>>,
    init_lock: Mutex<()>,
    constructions: AtomicUsize,
}

impl LazyDatabase {
    pub fn new(context: ProcessContext, factory: Arc<dyn DatabaseFactory>) -> Self {
        Self {
            context,
            factory,
            handle: OnceLock::new(),
            init_lock: Mutex::new(()),
            constructions: AtomicUsize::new(0),
        }
    }

    /// Get the shared handle, constructing it on first access.
    pub fn get(&self) -> Result<Arc<dyn Database>, DatabaseError> {
        if let Some(handle) = self.handle.get() {
            return Ok(Arc::clone(handle));
        }

        let _guard = self.init_lock.lock();
        if let Some(handle) = self.handle.get() {
            return Ok(Arc::clone(handle));
        }

        let handle = self.factory.open(&self.context)?;
        self.constructions.fetch_add(1, Ordering::SeqCst);
        info!("Database handle constructed");

        Ok(Arc::clone(self.handle.get_or_init(|| handle)))
    }

    /// Returns true once the handle has been constructed.
    pub fn is_constructed(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Number of successful constructions (0 or 1).
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LazyDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyDatabase")
            .field("constructed", &self.is_constructed())
            .finish()
    }
}

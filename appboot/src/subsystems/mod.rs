//! External subsystem contracts.
//!
//! The bootstrap core treats every subsystem it brings up as an external
//! collaborator and only depends on the narrow `init`/`get_instance`/
//! `is_running`/`stop` style contracts defined here. [`Collaborators`]
//! bundles one implementation of each.
//!
//! # Ordering
//!
//! ```text
//! PreferenceBootstrapper ──► SubsystemInitializers (sync, fatal on error)
//!          │
//!          └──────────────► warm-up tasks (background, isolated)
//!                               ├── TextSegmenter::initialize
//!                               └── LazyDatabase::get → problem_count
//! ```

mod database;
mod initializers;
mod preferences;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::context::ProcessContext;

pub use database::{DatabaseError, LazyDatabase};
pub use initializers::SubsystemInitializers;
pub use preferences::PreferenceBootstrapper;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by external subsystems.
#[derive(Debug, Error)]
pub enum SubsystemError {
    /// A subsystem failed to initialize.
    #[error("{subsystem} initialization failed: {reason}")]
    Init {
        subsystem: &'static str,
        reason: String,
    },

    /// I/O error inside a subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stopping a running service failed.
    #[error("Failed to stop {subsystem}: {reason}")]
    Stop {
        subsystem: &'static str,
        reason: String,
    },

    /// Instance lookup failed.
    #[error("Failed to obtain {subsystem} instance: {reason}")]
    Lookup {
        subsystem: &'static str,
        reason: String,
    },
}

impl SubsystemError {
    pub fn init(subsystem: &'static str, reason: impl Into<String>) -> Self {
        SubsystemError::Init {
            subsystem,
            reason: reason.into(),
        }
    }
}

/// Preference storage singleton (general or permission related).
pub trait PreferenceStore: Send + Sync {
    fn init(&self, context: &ProcessContext) -> Result<(), SubsystemError>;

    fn is_initialized(&self) -> bool;
}

/// Command execution subsystem.
pub trait ShellExecutor: Send + Sync {
    fn set_context(&self, context: &ProcessContext) -> Result<(), SubsystemError>;
}

/// Document resource loader.
pub trait ResourceLoader: Send + Sync {
    fn init(&self, context: &ProcessContext) -> Result<(), SubsystemError>;
}

/// Content-addressed image cache keyed by context.
pub trait ImageCache: Send + Sync {
    fn initialize(&self, context: &ProcessContext) -> Result<(), SubsystemError>;
}

/// Text segmentation engine. Initialization may block on I/O.
pub trait TextSegmenter: Send + Sync {
    fn initialize<'a>(
        &'a self,
        context: &'a ProcessContext,
    ) -> BoxFuture<'a, Result<(), SubsystemError>>;
}

/// Persistent store handle.
pub trait Database: Send + Sync {
    /// Used by the warm-up task only to force construction.
    fn problem_count(&self) -> Result<u64, DatabaseError>;
}

/// Opens the persistent store. Called at most once per process.
pub trait DatabaseFactory: Send + Sync {
    fn open(&self, context: &ProcessContext) -> Result<Arc<dyn Database>, DatabaseError>;
}

/// Local web server singleton.
pub trait LocalWebServer: Send + Sync {
    fn is_running(&self) -> bool;

    fn stop(&self) -> Result<(), SubsystemError>;
}

/// Accessor for the local web server singleton.
pub trait WebServerProvider: Send + Sync {
    fn get_instance(
        &self,
        context: &ProcessContext,
    ) -> Result<Arc<dyn LocalWebServer>, SubsystemError>;
}

/// One implementation of every external subsystem the bootstrap consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub general_preferences: Arc<dyn PreferenceStore>,
    pub permission_preferences: Arc<dyn PreferenceStore>,
    pub shell: Arc<dyn ShellExecutor>,
    pub resources: Arc<dyn ResourceLoader>,
    pub image_cache: Arc<dyn ImageCache>,
    pub text_segmenter: Arc<dyn TextSegmenter>,
    pub database: Arc<dyn DatabaseFactory>,
    pub web_server: Arc<dyn WebServerProvider>,
}

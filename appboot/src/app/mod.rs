//! Application bootstrap and lifecycle management.
//!
//! This module provides the `AssistantApp` type which handles initialization
//! sequencing and termination of every process-wide subsystem.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          AssistantApp                            │
//! │                                                                  │
//! │  attach_base_context ──► LocaleConfigurator (pre-attach pass)    │
//! │                                                                  │
//! │  on_create                                                       │
//! │   1. ExceptionHandlerInstaller ──► FaultHandler                  │
//! │   2. SerializationRegistry     ──► Codec                         │
//! │   3. PreferenceBootstrapper                                      │
//! │   4. LocaleConfigurator (post-attach pass)                       │
//! │   5. BackgroundTaskSet ──┬── text segmenter   (isolated)         │
//! │                          └── database warm-up (isolated)         │
//! │   6. SubsystemInitializers                                       │
//! │   7. ImageLoaderFactory        ──► ImageLoader                   │
//! │      └── ProcessSingletons published                             │
//! │                                                                  │
//! │  on_terminate ──► ShutdownHook (stop web server if running)      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use appboot::app::{AppConfig, AssistantApp};
//!
//! let mut app = AssistantApp::new(AppConfig::default(), platform, collaborators)?;
//! app.attach_base_context(base);
//! app.on_create()?;
//!
//! let codec = &app.singletons().unwrap().codec;
//!
//! app.on_terminate();
//! ```

mod bootstrap;
mod config;
mod error;
mod shutdown;
mod singletons;

pub use bootstrap::{AssistantApp, StartupStep};
pub use config::{
    default_config_path, AppConfig, ConfigError, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    DEFAULT_PACKAGE_NAME,
};
pub use error::AppError;
pub use shutdown::{ShutdownHook, ShutdownOutcome};
pub use singletons::ProcessSingletons;

//! Application bootstrap implementation.
//!
//! This module contains `AssistantApp`, which drives the three lifecycle entry
//! points the host invokes and enforces the startup ordering between them.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tracing::{error, info, warn};

use super::config::AppConfig;
use super::error::AppError;
use super::shutdown::{ShutdownHook, ShutdownOutcome};
use super::singletons::ProcessSingletons;
use crate::codec::{CodecModule, SerializationRegistry};
use crate::context::ProcessContext;
use crate::fault::{ExceptionHandlerInstaller, FaultHandler};
use crate::image::ImageLoaderFactory;
use crate::locale::{CapabilityTier, Locale, LocaleConfigurator, LocaleState};
use crate::platform::Platform;
use crate::subsystems::{
    Collaborators, LazyDatabase, PreferenceBootstrapper, SubsystemInitializers,
};
use crate::tasks::{dispatch_warmup, BackgroundTaskSet, TaskReport};

/// A completed step of the startup sequence, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupStep {
    /// Pre-attach locale pass ran (applied or fell back to the base context).
    AttachBaseContext,
    FaultHandler,
    Codec,
    Preferences,
    /// Post-attach locale pass ran (applied or failure swallowed).
    LocaleReapplied,
    BackgroundDispatch,
    Subsystems,
    ImageLoader,
}

impl fmt::Display for StartupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartupStep::AttachBaseContext => "attach-base-context",
            StartupStep::FaultHandler => "fault-handler",
            StartupStep::Codec => "codec",
            StartupStep::Preferences => "preferences",
            StartupStep::LocaleReapplied => "locale-reapplied",
            StartupStep::BackgroundDispatch => "background-dispatch",
            StartupStep::Subsystems => "subsystems",
            StartupStep::ImageLoader => "image-loader",
        };
        f.write_str(name)
    }
}

/// The application object the host drives through its lifecycle.
///
/// Startup runs in two stages:
///
/// 1. [`attach_base_context`](Self::attach_base_context) - pre-attach locale
///    pass, possibly substituting the base context
/// 2. [`on_create`](Self::on_create) - the synchronous sequence:
///    fault handler, codec, preferences, locale re-pass, background warm-up
///    dispatch, subsystem initializers, image loader
///
/// [`on_terminate`](Self::on_terminate) runs the shutdown hook.
///
/// # Runtime
///
/// Background tasks need a tokio runtime. When the app is built inside one
/// it spawns onto the caller's runtime; otherwise it owns a dedicated
/// multi-threaded runtime that lives as long as the app.
///
/// # Example
///
/// ```ignore
/// use appboot::app::{AppConfig, AssistantApp};
///
/// let mut app = AssistantApp::new(config, platform, collaborators)?;
/// let context = app.attach_base_context(base);
/// app.on_create()?;
///
/// // Later: termination
/// app.on_terminate();
/// ```
pub struct AssistantApp {
    config: AppConfig,
    collaborators: Collaborators,
    locale: LocaleConfigurator,
    context: Option<ProcessContext>,
    create_started: bool,
    trace: Vec<StartupStep>,
    fault_handler: Option<Arc<FaultHandler>>,
    tasks: Option<BackgroundTaskSet>,
    singletons: Option<ProcessSingletons>,
    runtime_handle: Handle,

    /// Owned runtime when created outside of one. Declared last so it is
    /// dropped after the task set.
    runtime: Option<Runtime>,
}

impl AssistantApp {
    /// Build the application object.
    ///
    /// The platform's capability tier is resolved here, once.
    ///
    /// # Errors
    ///
    /// Returns an error if a runtime is needed and cannot be created.
    pub fn new(
        config: AppConfig,
        platform: Arc<dyn Platform>,
        collaborators: Collaborators,
    ) -> Result<Self, AppError> {
        let tier = CapabilityTier::from_api_level(platform.api_level());
        let locale = LocaleConfigurator::new(config.locale.clone(), tier, platform);

        let (runtime, runtime_handle) = match Handle::try_current() {
            Ok(handle) => (None, handle),
            Err(_) => {
                let mut builder = tokio::runtime::Builder::new_multi_thread();
                builder.enable_all().thread_name("appboot-worker");
                if let Some(threads) = config.worker_threads {
                    builder.worker_threads(threads);
                }
                let runtime = builder
                    .build()
                    .map_err(|e| AppError::RuntimeCreation(e.to_string()))?;
                let handle = runtime.handle().clone();
                (Some(runtime), handle)
            }
        };

        info!(
            package = %config.package_name,
            tier = tier.name(),
            target_locale = %config.locale,
            owns_runtime = runtime.is_some(),
            "Application object created"
        );

        Ok(Self {
            config,
            collaborators,
            locale,
            context: None,
            create_started: false,
            trace: Vec::new(),
            fault_handler: None,
            tasks: None,
            singletons: None,
            runtime_handle,
            runtime,
        })
    }

    /// Pre-attach entry point. Returns the context the process should use.
    ///
    /// On locale failure the base context is returned unchanged; this never
    /// aborts startup.
    pub fn attach_base_context(&mut self, base: ProcessContext) -> ProcessContext {
        let context = match self.locale.attach_base_context(&base) {
            Ok(application) => {
                info!(
                    tier = application.tier.name(),
                    actions = application.actions.len(),
                    "Pre-attach locale pass applied"
                );
                application.context
            }
            Err(e) => {
                warn!(error = %e, "Pre-attach locale pass failed, attaching base context");
                base
            }
        };

        self.context = Some(context.clone());
        self.trace.push(StartupStep::AttachBaseContext);
        context
    }

    /// Main startup entry point. Runs the synchronous sequence once.
    ///
    /// Background warm-up is dispatched part-way through and is not waited
    /// for.
    ///
    /// # Errors
    ///
    /// Preference, subsystem and image loader failures abort startup; no
    /// singletons are published in that case.
    pub fn on_create(&mut self) -> Result<(), AppError> {
        if self.create_started {
            return Err(AppError::AlreadyCreated);
        }
        let context = self.context.clone().ok_or(AppError::NotAttached)?;
        self.create_started = true;

        info!(package = %context.package_name(), "Starting application");

        // 1. Fault handler first, so everything after it is covered.
        let faults = if self.config.install_panic_hook {
            ExceptionHandlerInstaller::install(&context, self.config.fault_history)
        } else {
            Arc::new(FaultHandler::with_capacity(
                context.package_name(),
                self.config.fault_history,
            ))
        };
        self.fault_handler = Some(Arc::clone(&faults));
        self.trace.push(StartupStep::FaultHandler);

        // 2. Shared codec
        let codec = Arc::new(SerializationRegistry::build(CodecModule::standard()));
        self.trace.push(StartupStep::Codec);

        // 3. Preferences
        PreferenceBootstrapper::new(
            Arc::clone(&self.collaborators.general_preferences),
            Arc::clone(&self.collaborators.permission_preferences),
        )
        .init_all(&context)
        .map_err(|e| {
            error!(error = %e, "Preference initialization failed, aborting startup");
            AppError::Preferences(e)
        })?;
        self.trace.push(StartupStep::Preferences);

        // 4. Locale re-pass
        if let Err(e) = self.locale.initialize_app_language(&context) {
            warn!(error = %e, "Post-attach locale pass failed, continuing");
        }
        self.trace.push(StartupStep::LocaleReapplied);

        // 5. Background warm-up
        let database = Arc::new(LazyDatabase::new(
            context.clone(),
            Arc::clone(&self.collaborators.database),
        ));
        let tasks = BackgroundTaskSet::new(self.runtime_handle.clone(), Arc::clone(&faults));
        dispatch_warmup(
            &tasks,
            &context,
            Arc::clone(&self.collaborators.text_segmenter),
            Arc::clone(&database),
        );
        self.tasks = Some(tasks);
        self.trace.push(StartupStep::BackgroundDispatch);

        // 6. Synchronous subsystem initializers
        SubsystemInitializers::new(
            Arc::clone(&self.collaborators.shell),
            Arc::clone(&self.collaborators.resources),
            Arc::clone(&self.collaborators.image_cache),
        )
        .initialize_all(&context)
        .map_err(|e| {
            error!(error = %e, "Subsystem initialization failed, aborting startup");
            AppError::Subsystems(e)
        })?;
        self.trace.push(StartupStep::Subsystems);

        // 7. Image loader
        let image_loader = ImageLoaderFactory::build(&context, &self.config.image_cache)
            .map_err(|e| {
                error!(error = %e, "Image loader construction failed, aborting startup");
                AppError::ImageLoader(e)
            })?;
        self.trace.push(StartupStep::ImageLoader);

        self.singletons = Some(ProcessSingletons {
            context,
            faults,
            codec,
            image_loader: Arc::new(image_loader),
            database,
        });

        info!(target_locale = %self.config.locale, "Application started");
        Ok(())
    }

    /// Termination entry point. Never fails.
    pub fn on_terminate(&mut self) -> ShutdownOutcome {
        let Some(context) = &self.context else {
            info!("Terminating before a context was attached, nothing to shut down");
            return ShutdownOutcome::Skipped;
        };

        info!("Terminating application");
        ShutdownHook::new(Arc::clone(&self.collaborators.web_server)).run(context)
    }

    /// Block until every dispatched background task has finished.
    ///
    /// Must not be called from within an async context; use
    /// [`await_background`](Self::await_background) there.
    pub fn join_background(&self) -> Vec<TaskReport> {
        let Some(tasks) = &self.tasks else {
            return Vec::new();
        };
        match &self.runtime {
            Some(runtime) => runtime.block_on(tasks.join()),
            None => futures::executor::block_on(tasks.join()),
        }
    }

    /// Wait for every dispatched background task to finish.
    pub async fn await_background(&self) -> Vec<TaskReport> {
        match &self.tasks {
            Some(tasks) => tasks.join().await,
            None => Vec::new(),
        }
    }

    /// Singletons, available once `on_create` has succeeded.
    pub fn singletons(&self) -> Option<&ProcessSingletons> {
        self.singletons.as_ref()
    }

    /// The fault handler, available once `on_create` has started.
    pub fn fault_handler(&self) -> Option<Arc<FaultHandler>> {
        self.fault_handler.clone()
    }

    /// The context attached by `attach_base_context`.
    pub fn context(&self) -> Option<&ProcessContext> {
        self.context.as_ref()
    }

    /// Completed startup steps in execution order.
    pub fn startup_trace(&self) -> &[StartupStep] {
        &self.trace
    }

    pub fn tier(&self) -> CapabilityTier {
        self.locale.tier()
    }

    pub fn locale_state(&self) -> LocaleState {
        self.locale.state()
    }

    /// The locale the process effectively runs with.
    pub fn current_locale(&self) -> Locale {
        self.locale.current_locale()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the runtime background tasks run on.
    pub fn runtime_handle(&self) -> Handle {
        self.runtime_handle.clone()
    }
}

impl fmt::Debug for AssistantApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantApp")
            .field("package", &self.config.package_name)
            .field("tier", &self.locale.tier())
            .field("locale_state", &self.locale.state())
            .field("trace", &self.trace)
            .field("created", &self.singletons.is_some())
            .finish()
    }
}

//! Synchronous subsystem initializers.

use std::sync::Arc;

use tracing::info;

use super::{ImageCache, ResourceLoader, ShellExecutor, SubsystemError};
use crate::context::ProcessContext;

/// Order-insensitive initializers run on the main sequence.
///
/// They depend on preferences being initialized but not on each other. A
/// failure is returned to the caller and aborts startup.
pub struct SubsystemInitializers {
    shell: Arc<dyn ShellExecutor>,
    resources: Arc<dyn ResourceLoader>,
    image_cache: Arc<dyn ImageCache>,
}

impl SubsystemInitializers {
    pub fn new(
        shell: Arc<dyn ShellExecutor>,
        resources: Arc<dyn ResourceLoader>,
        image_cache: Arc<dyn ImageCache>,
    ) -> Self {
        Self {
            shell,
            resources,
            image_cache,
        }
    }

    /// Run every initializer, stopping at the first failure.
    pub fn initialize_all(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        self.shell.set_context(context)?;
        info!("Command executor bound to process context");

        self.resources.init(context)?;
        info!("Document resource loader primed");

        self.image_cache.initialize(context)?;
        info!("Content-addressed image cache primed");

        Ok(())
    }
}

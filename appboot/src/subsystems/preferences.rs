//! Preference bootstrap.

use std::sync::Arc;

use tracing::{debug, info};

use super::{PreferenceStore, SubsystemError};
use crate::context::ProcessContext;

/// Initializes the general and permission preference stores.
///
/// Must run after the context is available and before anything that reads
/// preferences. Stores that report themselves initialized are skipped.
pub struct PreferenceBootstrapper {
    general: Arc<dyn PreferenceStore>,
    permissions: Arc<dyn PreferenceStore>,
}

impl PreferenceBootstrapper {
    pub fn new(general: Arc<dyn PreferenceStore>, permissions: Arc<dyn PreferenceStore>) -> Self {
        Self {
            general,
            permissions,
        }
    }

    pub fn init_general(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        Self::init_store("general", self.general.as_ref(), context)
    }

    pub fn init_permissions(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        Self::init_store("permissions", self.permissions.as_ref(), context)
    }

    /// Initialize both stores, general first.
    pub fn init_all(&self, context: &ProcessContext) -> Result<(), SubsystemError> {
        self.init_general(context)?;
        self.init_permissions(context)
    }

    fn init_store(
        name: &'static str,
        store: &dyn PreferenceStore,
        context: &ProcessContext,
    ) -> Result<(), SubsystemError> {
        if store.is_initialized() {
            debug!(store = name, "Preference store already initialized, skipping");
            return Ok(());
        }
        store.init(context)?;
        info!(store = name, "Preference store initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedPreferences;

    fn context() -> ProcessContext {
        ProcessContext::new("pkg", "/data", 0)
    }

    #[test]
    fn test_init_all_initializes_both_stores() {
        let general = Arc::new(SimulatedPreferences::new("general", false));
        let permissions = Arc::new(SimulatedPreferences::new("permissions", false));
        let bootstrapper = PreferenceBootstrapper::new(general.clone(), permissions.clone());

        bootstrapper.init_all(&context()).unwrap();

        assert!(general.is_initialized());
        assert!(permissions.is_initialized());
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        let general = Arc::new(SimulatedPreferences::new("general", false));
        let permissions = Arc::new(SimulatedPreferences::new("permissions", false));
        let bootstrapper = PreferenceBootstrapper::new(general.clone(), permissions.clone());

        bootstrapper.init_all(&context()).unwrap();
        bootstrapper.init_all(&context()).unwrap();

        assert_eq!(general.init_count(), 1);
        assert_eq!(permissions.init_count(), 1);
    }

    #[test]
    fn test_general_failure_skips_permissions() {
        let general = Arc::new(SimulatedPreferences::new("general", true));
        let permissions = Arc::new(SimulatedPreferences::new("permissions", false));
        let bootstrapper = PreferenceBootstrapper::new(general, permissions.clone());

        assert!(bootstrapper.init_all(&context()).is_err());
        assert_eq!(permissions.init_count(), 0);
    }
}

//! Process context handle.
//!
//! A [`ProcessContext`] is the host-provided handle giving access to the
//! running instance's storage paths, reported memory, and its current
//! [`Configuration`]. It is cheap to clone; clones share the same
//! configuration slot. Deriving a context with
//! [`ProcessContext::with_configuration`] produces a handle with its own slot,
//! which is how the pre-attach locale pass substitutes the base context.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::locale::{Locale, LocaleList};

/// Name of the private files directory under the data root.
pub const FILES_DIR_NAME: &str = "files";

/// Name of the private cache directory under the data root.
pub const CACHE_DIR_NAME: &str = "cache";

/// Resource configuration carried by a context.
///
/// Newer hosts read `locales`; legacy hosts only understand the single
/// `legacy_locale` field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Ordered locale preference list.
    pub locales: LocaleList,

    /// Single locale field used by legacy hosts.
    pub legacy_locale: Option<Locale>,
}

impl Configuration {
    /// Create a configuration with a single locale in both fields.
    pub fn with_locale(locale: Locale) -> Self {
        Self {
            locales: LocaleList::single(locale.clone()),
            legacy_locale: Some(locale),
        }
    }

    /// The locale resources resolve against, if any.
    pub fn primary_locale(&self) -> Option<&Locale> {
        self.locales.primary().or(self.legacy_locale.as_ref())
    }
}

#[derive(Debug)]
struct ContextInner {
    package_name: String,
    files_dir: PathBuf,
    cache_dir: PathBuf,
    available_memory_bytes: u64,
}

/// Handle to the running application instance.
#[derive(Clone)]
pub struct ProcessContext {
    inner: Arc<ContextInner>,
    configuration: Arc<RwLock<Configuration>>,
}

impl ProcessContext {
    /// Create a base context rooted at `data_dir`.
    ///
    /// # Arguments
    ///
    /// * `package_name` - Owning application identifier
    /// * `data_dir` - Private data root; `files/` and `cache/` live beneath it
    /// * `available_memory_bytes` - Memory the host reports as available
    pub fn new(
        package_name: impl Into<String>,
        data_dir: impl AsRef<Path>,
        available_memory_bytes: u64,
    ) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            inner: Arc::new(ContextInner {
                package_name: package_name.into(),
                files_dir: data_dir.join(FILES_DIR_NAME),
                cache_dir: data_dir.join(CACHE_DIR_NAME),
                available_memory_bytes,
            }),
            configuration: Arc::new(RwLock::new(Configuration::default())),
        }
    }

    /// Set the initial configuration of this handle (builder style).
    pub fn with_initial_configuration(self, configuration: Configuration) -> Self {
        *self.configuration.write() = configuration;
        self
    }

    /// Derive a new context that shares paths but carries `configuration`.
    ///
    /// The returned handle does not observe later updates made through
    /// `self`, and vice versa.
    pub fn with_configuration(&self, configuration: Configuration) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            configuration: Arc::new(RwLock::new(configuration)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn configuration(&self) -> Configuration {
        self.configuration.read().clone()
    }

    /// Replace the configuration seen by this handle and its clones.
    pub fn replace_configuration(&self, configuration: Configuration) {
        *self.configuration.write() = configuration;
    }

    /// Returns true if both handles share the same configuration slot.
    pub fn same_handle(&self, other: &ProcessContext) -> bool {
        Arc::ptr_eq(&self.configuration, &other.configuration)
    }

    pub fn package_name(&self) -> &str {
        &self.inner.package_name
    }

    pub fn files_dir(&self) -> &Path {
        &self.inner.files_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    pub fn available_memory_bytes(&self) -> u64 {
        self.inner.available_memory_bytes
    }
}

impl fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("package_name", &self.inner.package_name)
            .field("files_dir", &self.inner.files_dir)
            .field("cache_dir", &self.inner.cache_dir)
            .field("configuration", &*self.configuration.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(tag: &str) -> Locale {
        tag.parse().unwrap()
    }

    #[test]
    fn test_context_paths_live_under_data_dir() {
        let ctx = ProcessContext::new("com.example.assistant", "/data/app", 1024);
        assert_eq!(ctx.files_dir(), Path::new("/data/app/files"));
        assert_eq!(ctx.cache_dir(), Path::new("/data/app/cache"));
        assert_eq!(ctx.available_memory_bytes(), 1024);
        assert_eq!(ctx.package_name(), "com.example.assistant");
    }

    #[test]
    fn test_clones_share_configuration() {
        let ctx = ProcessContext::new("pkg", "/data", 0);
        let clone = ctx.clone();
        clone.replace_configuration(Configuration::with_locale(locale("fr-FR")));

        assert!(ctx.same_handle(&clone));
        assert_eq!(ctx.configuration().primary_locale(), Some(&locale("fr-FR")));
    }

    #[test]
    fn test_derived_context_is_independent() {
        let base = ProcessContext::new("pkg", "/data", 0)
            .with_initial_configuration(Configuration::with_locale(locale("en-US")));
        let derived = base.with_configuration(Configuration::with_locale(locale("de-DE")));

        assert!(!base.same_handle(&derived));
        assert_eq!(base.configuration().primary_locale(), Some(&locale("en-US")));
        assert_eq!(derived.configuration().primary_locale(), Some(&locale("de-DE")));
        assert_eq!(derived.files_dir(), base.files_dir());
    }

    #[test]
    fn test_primary_locale_prefers_list() {
        let config = Configuration {
            locales: LocaleList::single(locale("ja-JP")),
            legacy_locale: Some(locale("en-US")),
        };
        assert_eq!(config.primary_locale(), Some(&locale("ja-JP")));

        let legacy_only = Configuration {
            locales: LocaleList::default(),
            legacy_locale: Some(locale("en-US")),
        };
        assert_eq!(legacy_only.primary_locale(), Some(&locale("en-US")));
    }
}

//! Application configuration.
//!
//! [`AppConfig`] is the single configuration surface passed to
//! [`AssistantApp::new`](super::AssistantApp::new). Defaults reproduce the
//! fixed production constants; an optional INI file can override them:
//!
//! ```ini
//! [locale]
//! target = zh-CN
//!
//! [image_cache]
//! memory_enabled = true
//! memory_fraction = 0.15
//! disk_enabled = true
//! disk_max_bytes = 52428800
//! disk_directory = image_cache
//! crossfade = true
//! crossfade_millis = 100
//! respect_cache_headers = true
//!
//! [runtime]
//! worker_threads = 4
//!
//! [diagnostics]
//! panic_hook = true
//! fault_history = 64
//! ```
//!
//! Unknown sections and keys are ignored. A value that does not parse is an
//! error rather than silently falling back to the default.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::fault::DEFAULT_FAULT_HISTORY;
use crate::image::CachePolicySpec;
use crate::locale::LocaleTarget;

/// Package name used when none is configured.
pub const DEFAULT_PACKAGE_NAME: &str = "com.example.assistant";

/// Directory under the user config dir.
pub const CONFIG_DIR_NAME: &str = "appboot";

pub const CONFIG_FILE_NAME: &str = "config.ini";

const SECTION_LOCALE: &str = "locale";
const SECTION_IMAGE_CACHE: &str = "image_cache";
const SECTION_RUNTIME: &str = "runtime";
const SECTION_DIAGNOSTICS: &str = "diagnostics";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Owning application identifier.
    pub package_name: String,

    /// Locale both lifecycle passes converge on.
    pub locale: LocaleTarget,

    /// Image loader sizing and presentation.
    pub image_cache: CachePolicySpec,

    /// Worker threads for an owned runtime; `None` uses tokio's default.
    pub worker_threads: Option<usize>,

    /// Install the fault handler as the process panic hook.
    pub install_panic_hook: bool,

    /// Fault records kept for diagnostics.
    pub fault_history: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            locale: LocaleTarget::default(),
            image_cache: CachePolicySpec::default(),
            worker_threads: None,
            install_panic_hook: true,
            fault_history: DEFAULT_FAULT_HISTORY,
        }
    }
}

impl AppConfig {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    pub fn with_locale(mut self, locale: LocaleTarget) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_image_cache(mut self, policy: CachePolicySpec) -> Self {
        self.image_cache = policy;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_panic_hook(mut self, install: bool) -> Self {
        self.install_panic_hook = install;
        self
    }

    pub fn with_fault_history(mut self, capacity: usize) -> Self {
        self.fault_history = capacity;
        self
    }

    /// Load overrides from an INI file on top of `self`.
    pub fn load_file(self, path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_ini(&ini)
    }

    /// Load overrides from INI text on top of `self`.
    pub fn load_str(self, text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        self.apply_ini(&ini)
    }

    fn apply_ini(mut self, ini: &Ini) -> Result<Self, ConfigError> {
        if let Some(section) = ini.section(Some(SECTION_LOCALE)) {
            if let Some(value) = section.get("target") {
                self.locale = LocaleTarget::parse(value).map_err(|e| ConfigError::InvalidValue {
                    section: SECTION_LOCALE,
                    key: "target",
                    value: value.to_string(),
                    reason: e.to_string(),
                })?;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_IMAGE_CACHE)) {
            let s = SECTION_IMAGE_CACHE;
            let policy = &mut self.image_cache;
            set_parsed(section, s, "memory_enabled", parse_bool, &mut policy.memory_enabled)?;
            set_parsed(section, s, "memory_fraction", parse_from_str, &mut policy.memory_fraction)?;
            set_parsed(section, s, "disk_enabled", parse_bool, &mut policy.disk_enabled)?;
            set_parsed(section, s, "disk_max_bytes", parse_from_str, &mut policy.disk_max_bytes)?;
            set_parsed(section, s, "disk_directory", parse_from_str, &mut policy.disk_directory)?;
            set_parsed(section, s, "crossfade", parse_bool, &mut policy.crossfade)?;
            set_parsed(
                section,
                s,
                "crossfade_millis",
                parse_from_str,
                &mut policy.crossfade_millis,
            )?;
            set_parsed(
                section,
                s,
                "respect_cache_headers",
                parse_bool,
                &mut policy.respect_cache_headers,
            )?;
        }

        if let Some(section) = ini.section(Some(SECTION_RUNTIME)) {
            let mut threads = 0usize;
            if section.get("worker_threads").is_some() {
                set_parsed(
                    section,
                    SECTION_RUNTIME,
                    "worker_threads",
                    parse_from_str,
                    &mut threads,
                )?;
                self.worker_threads = (threads > 0).then_some(threads);
            }
        }

        if let Some(section) = ini.section(Some(SECTION_DIAGNOSTICS)) {
            let s = SECTION_DIAGNOSTICS;
            set_parsed(section, s, "panic_hook", parse_bool, &mut self.install_panic_hook)?;
            set_parsed(section, s, "fault_history", parse_from_str, &mut self.fault_history)?;
        }

        Ok(self)
    }

    /// Render the effective configuration as INI.
    pub fn to_ini(&self) -> Ini {
        let policy = &self.image_cache;
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_LOCALE))
            .set("target", self.locale.locale().to_tag());
        ini.with_section(Some(SECTION_IMAGE_CACHE))
            .set("memory_enabled", policy.memory_enabled.to_string())
            .set("memory_fraction", policy.memory_fraction.to_string())
            .set("disk_enabled", policy.disk_enabled.to_string())
            .set("disk_max_bytes", policy.disk_max_bytes.to_string())
            .set("disk_directory", policy.disk_directory.clone())
            .set("crossfade", policy.crossfade.to_string())
            .set("crossfade_millis", policy.crossfade_millis.to_string())
            .set("respect_cache_headers", policy.respect_cache_headers.to_string());
        ini.with_section(Some(SECTION_RUNTIME)).set(
            "worker_threads",
            self.worker_threads.unwrap_or(0).to_string(),
        );
        ini.with_section(Some(SECTION_DIAGNOSTICS))
            .set("panic_hook", self.install_panic_hook.to_string())
            .set("fault_history", self.fault_history.to_string());
        ini
    }
}

/// Default config file location: `<config dir>/appboot/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn set_parsed<T>(
    section: &Properties,
    section_name: &'static str,
    key: &'static str,
    parse: fn(&str) -> Result<T, String>,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = section.get(key) {
        *target = parse(value.trim()).map_err(|reason| ConfigError::InvalidValue {
            section: section_name,
            key,
            value: value.to_string(),
            reason,
        })?;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err("expected a boolean".to_string()),
    }
}

fn parse_from_str<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| e.to_string())
}

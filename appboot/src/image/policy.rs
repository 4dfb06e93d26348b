//! Image cache policy.

use std::path::{Component, Path};

use super::ImageCacheError;

/// Share of available memory given to the memory tier.
pub const DEFAULT_MEMORY_FRACTION: f64 = 0.15;

/// Disk tier ceiling (50 MiB).
pub const DEFAULT_DISK_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Cross-fade duration applied when cross-fading is enabled.
pub const DEFAULT_CROSSFADE_MILLIS: u32 = 100;

/// Disk tier directory, relative to the process cache dir.
pub const IMAGE_CACHE_DIR_NAME: &str = "image_cache";

/// Memory and disk bounds plus presentation flags for the image loader.
#[derive(Clone, Debug, PartialEq)]
pub struct CachePolicySpec {
    /// Cross-fade newly loaded images in.
    pub crossfade: bool,

    pub crossfade_millis: u32,

    /// Honour `Cache-Control` when deciding whether to persist a response.
    pub respect_cache_headers: bool,

    pub memory_enabled: bool,

    /// Fraction of available memory, in `(0, 1]`.
    pub memory_fraction: f64,

    pub disk_enabled: bool,

    /// Absolute ceiling for the disk tier in bytes.
    pub disk_max_bytes: u64,

    /// Directory under the process cache dir.
    pub disk_directory: String,
}

impl Default for CachePolicySpec {
    fn default() -> Self {
        Self {
            crossfade: true,
            crossfade_millis: DEFAULT_CROSSFADE_MILLIS,
            respect_cache_headers: true,
            memory_enabled: true,
            memory_fraction: DEFAULT_MEMORY_FRACTION,
            disk_enabled: true,
            disk_max_bytes: DEFAULT_DISK_MAX_BYTES,
            disk_directory: IMAGE_CACHE_DIR_NAME.to_string(),
        }
    }
}

impl CachePolicySpec {
    /// Memory tier budget for a host reporting `available_bytes`.
    pub fn memory_budget_bytes(&self, available_bytes: u64) -> u64 {
        (available_bytes as f64 * self.memory_fraction).floor() as u64
    }

    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.memory_fraction = fraction;
        self
    }

    pub fn with_disk_max_bytes(mut self, bytes: u64) -> Self {
        self.disk_max_bytes = bytes;
        self
    }

    pub fn with_crossfade(mut self, enabled: bool) -> Self {
        self.crossfade = enabled;
        self
    }

    pub fn with_memory_enabled(mut self, enabled: bool) -> Self {
        self.memory_enabled = enabled;
        self
    }

    pub fn with_disk_enabled(mut self, enabled: bool) -> Self {
        self.disk_enabled = enabled;
        self
    }

    /// Check the policy before any cache is built.
    pub fn validate(&self) -> Result<(), ImageCacheError> {
        if self.memory_enabled
            && !(self.memory_fraction.is_finite()
                && self.memory_fraction > 0.0
                && self.memory_fraction <= 1.0)
        {
            return Err(ImageCacheError::InvalidPolicy(format!(
                "memory fraction must be in (0, 1], got {}",
                self.memory_fraction
            )));
        }

        if self.disk_enabled {
            if self.disk_max_bytes == 0 {
                return Err(ImageCacheError::InvalidPolicy(
                    "disk ceiling must be greater than zero".to_string(),
                ));
            }
            let relative = Path::new(&self.disk_directory)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if self.disk_directory.is_empty() || !relative {
                return Err(ImageCacheError::InvalidPolicy(format!(
                    "disk directory must be a plain relative path, got '{}'",
                    self.disk_directory
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_constants() {
        let policy = CachePolicySpec::default();
        assert!(policy.crossfade);
        assert!(policy.respect_cache_headers);
        assert!(policy.memory_enabled);
        assert!(policy.disk_enabled);
        assert_eq!(policy.memory_fraction, 0.15);
        assert_eq!(policy.disk_max_bytes, 50 * 1024 * 1024);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_memory_budget_is_fraction_of_available() {
        let policy = CachePolicySpec::default();
        assert_eq!(policy.memory_budget_bytes(1_000_000), 150_000);
        assert_eq!(policy.memory_budget_bytes(0), 0);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        for fraction in [0.0, -0.1, 1.5, f64::NAN] {
            let policy = CachePolicySpec::default().with_memory_fraction(fraction);
            assert!(policy.validate().is_err(), "fraction {} accepted", fraction);
        }
    }

    #[test]
    fn test_validate_ignores_fraction_when_memory_disabled() {
        let policy = CachePolicySpec::default()
            .with_memory_enabled(false)
            .with_memory_fraction(0.0);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_escaping_directory() {
        for dir in ["", "../images", "/tmp/images"] {
            let policy = CachePolicySpec {
                disk_directory: dir.to_string(),
                ..CachePolicySpec::default()
            };
            assert!(policy.validate().is_err(), "'{}' accepted", dir);
        }
    }

    #[test]
    fn test_validate_rejects_zero_disk_ceiling() {
        let policy = CachePolicySpec::default().with_disk_max_bytes(0);
        assert!(policy.validate().is_err());
        assert!(policy.with_disk_enabled(false).validate().is_ok());
    }
}

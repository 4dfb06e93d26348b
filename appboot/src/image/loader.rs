//! Image loader facade and factory.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::{CacheControl, CachePolicySpec, DiskImageCache, ImageCacheError, MemoryImageCache};
use crate::context::ProcessContext;

/// Where a stored image ended up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    pub memory: bool,
    pub disk: bool,
}

/// Process-wide image loader.
pub struct ImageLoader {
    policy: CachePolicySpec,
    memory: Option<MemoryImageCache>,
    disk: Option<DiskImageCache>,
}

impl ImageLoader {
    /// Look up an image, memory first. Disk hits are promoted to memory.
    pub fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, ImageCacheError> {
        if let Some(memory) = &self.memory {
            if let Some(data) = memory.get(key) {
                return Ok(Some(data));
            }
        }

        let Some(disk) = &self.disk else {
            return Ok(None);
        };

        match disk.get(key)? {
            Some(bytes) => {
                let data = Arc::new(bytes);
                if let Some(memory) = &self.memory {
                    memory.put(key, Arc::clone(&data));
                }
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Store a fetched image.
    ///
    /// With `respect_cache_headers` set, a response whose `Cache-Control`
    /// forbids storage is kept in memory only.
    pub fn store(
        &self,
        key: &str,
        data: Vec<u8>,
        cache_control: Option<&CacheControl>,
    ) -> Result<StoreOutcome, ImageCacheError> {
        let data = Arc::new(data);
        let mut outcome = StoreOutcome::default();

        if let Some(disk) = &self.disk {
            let permitted = !self.policy.respect_cache_headers
                || cache_control.map_or(true, CacheControl::permits_disk_storage);
            if permitted {
                disk.put(key, &data)?;
                outcome.disk = true;
            } else {
                debug!(key, "Cache-Control forbids disk storage");
            }
        }

        if let Some(memory) = &self.memory {
            memory.put(key, data);
            outcome.memory = true;
        }

        Ok(outcome)
    }

    /// Cross-fade duration, or `None` when cross-fading is off.
    pub fn crossfade_millis(&self) -> Option<u32> {
        self.policy.crossfade.then_some(self.policy.crossfade_millis)
    }

    pub fn policy(&self) -> &CachePolicySpec {
        &self.policy
    }

    pub fn memory_cache(&self) -> Option<&MemoryImageCache> {
        self.memory.as_ref()
    }

    pub fn disk_cache(&self) -> Option<&DiskImageCache> {
        self.disk.as_ref()
    }

    pub fn disk_directory(&self) -> Option<&Path> {
        self.disk.as_ref().map(DiskImageCache::directory)
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("memory_max_bytes", &self.memory.as_ref().map(|m| m.max_size_bytes()))
            .field("disk_directory", &self.disk_directory())
            .field("disk_max_bytes", &self.disk.as_ref().map(|d| d.max_size_bytes()))
            .field("crossfade_millis", &self.crossfade_millis())
            .finish()
    }
}

/// Builds the process image loader from a policy.
pub struct ImageLoaderFactory;

impl ImageLoaderFactory {
    /// Build a loader sized for `context`.
    ///
    /// The memory tier gets `memory_fraction` of the context's available
    /// memory; the disk tier lives under the context's cache dir.
    pub fn build(
        context: &ProcessContext,
        policy: &CachePolicySpec,
    ) -> Result<ImageLoader, ImageCacheError> {
        policy.validate()?;

        let memory = policy.memory_enabled.then(|| {
            MemoryImageCache::new(policy.memory_budget_bytes(context.available_memory_bytes()))
        });

        let disk = if policy.disk_enabled {
            let directory = context.cache_dir().join(&policy.disk_directory);
            Some(DiskImageCache::open(directory, policy.disk_max_bytes)?)
        } else {
            None
        };

        let loader = ImageLoader {
            policy: policy.clone(),
            memory,
            disk,
        };

        info!(
            memory_max_bytes = loader.memory.as_ref().map(|m| m.max_size_bytes()),
            disk_max_bytes = loader.disk.as_ref().map(|d| d.max_size_bytes()),
            crossfade = policy.crossfade,
            "Image loader built"
        );
        Ok(loader)
    }
}

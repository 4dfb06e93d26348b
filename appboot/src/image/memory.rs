//! Memory tier backed by moka.

use std::sync::Arc;

use moka::sync::Cache as MokaCache;

/// Byte-weighted in-memory image cache with LRU eviction.
pub struct MemoryImageCache {
    cache: MokaCache<String, Arc<Vec<u8>>>,
    max_size_bytes: u64,
}

impl MemoryImageCache {
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // moka uses u32 weights, cap very large entries
            .weigher(|_key: &String, value: &Arc<Vec<u8>>| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.cache.get(key)
    }

    pub fn put(&self, key: &str, data: Arc<Vec<u8>>) {
        self.cache.insert(key.to_string(), data);
    }

    /// Current weighted size after pending evictions have run.
    pub fn size_bytes(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.weighted_size()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}

//! Shared image loader.
//!
//! One [`ImageLoader`] is built during startup by [`ImageLoaderFactory`] and
//! shared for the process lifetime. It fronts two cache tiers:
//!
//! ```text
//! get(key) ──► MemoryImageCache (moka, weighted by bytes)
//!                 │ miss
//!                 ▼
//!              DiskImageCache (SHA-256 named files, hard byte ceiling)
//!                 │ hit
//!                 └──► promoted to memory
//! ```
//!
//! Sizing comes from [`CachePolicySpec`]: memory is a fraction of the memory
//! the host reports as available, disk is an absolute byte ceiling that is
//! never exceeded regardless of device storage.

mod disk;
mod headers;
mod loader;
mod memory;
mod policy;

use thiserror::Error;

pub use disk::{DiskImageCache, EvictionResult};
pub use headers::CacheControl;
pub use loader::{ImageLoader, ImageLoaderFactory, StoreOutcome};
pub use memory::MemoryImageCache;
pub use policy::{
    CachePolicySpec, DEFAULT_CROSSFADE_MILLIS, DEFAULT_DISK_MAX_BYTES, DEFAULT_MEMORY_FRACTION,
    IMAGE_CACHE_DIR_NAME,
};

/// Errors raised by the image loader and its caches.
#[derive(Debug, Error)]
pub enum ImageCacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cache policy: {0}")]
    InvalidPolicy(String),

    #[error("Entry too large: {size} bytes (max: {max})")]
    EntryTooLarge { size: u64, max: u64 },
}

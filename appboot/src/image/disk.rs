//! Disk tier with a hard byte ceiling.
//!
//! Entries are stored as `<sha256(key)>.img` in a single directory. Writes go
//! through a temporary file and a rename so readers never observe a partial
//! entry. Before each write the least recently modified entries are evicted
//! until the new entry fits under the ceiling; reads refresh an entry's
//! modification time. Temporary files left behind by an interrupted write are
//! removed when the cache is opened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::ImageCacheError;

const ENTRY_EXTENSION: &str = "img";
const TEMP_EXTENSION: &str = "tmp";

/// Outcome of an eviction pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvictionResult {
    pub entries_removed: usize,
    pub bytes_freed: u64,
    pub duration_ms: u64,
}

struct DiskEntry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Content-addressed image cache on disk.
pub struct DiskImageCache {
    directory: PathBuf,
    max_size_bytes: u64,
    /// Tracked total size; the lock also serialises writers.
    size_bytes: Mutex<u64>,
}

impl DiskImageCache {
    /// Open (creating if needed) a cache directory and trim it to `max_size_bytes`.
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory holding the entries
    /// * `max_size_bytes` - Ceiling the directory is kept under
    pub fn open(
        directory: impl Into<PathBuf>,
        max_size_bytes: u64,
    ) -> Result<Self, ImageCacheError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        remove_stale_temps(&directory)?;

        let cache = Self {
            directory,
            max_size_bytes,
            size_bytes: Mutex::new(0),
        };

        {
            let mut size = cache.size_bytes.lock();
            cache.evict_locked(&mut size, max_size_bytes)?;
        }

        debug!(
            directory = %cache.directory.display(),
            size_bytes = cache.size_bytes(),
            max_size_bytes,
            "Disk image cache opened"
        );
        Ok(cache)
    }

    /// Read an entry, refreshing its recency on hit.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ImageCacheError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                if let Err(e) = touch(&path) {
                    debug!(path = %path.display(), error = %e, "Failed to refresh entry mtime");
                }
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Evict until `data` fits under the ceiling, then write it.
    ///
    /// An existing entry for `key` is replaced. The directory never holds
    /// more than the ceiling, counting the temporary file.
    pub fn put(&self, key: &str, data: &[u8]) -> Result<EvictionResult, ImageCacheError> {
        let len = data.len() as u64;
        if len > self.max_size_bytes {
            return Err(ImageCacheError::EntryTooLarge {
                size: len,
                max: self.max_size_bytes,
            });
        }

        let mut size = self.size_bytes.lock();
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let result = self.evict_locked(&mut size, self.max_size_bytes - len)?;

        let temp = path.with_extension(TEMP_EXTENSION);
        if let Err(e) = fs::write(&temp, data).and_then(|()| fs::rename(&temp, &path)) {
            if let Err(cleanup) = fs::remove_file(&temp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %temp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e.into());
        }

        *size += len;
        Ok(result)
    }

    /// Remove an entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool, ImageCacheError> {
        let mut size = self.size_bytes.lock();
        let path = self.entry_path(key);
        let len = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        fs::remove_file(&path)?;
        *size = size.saturating_sub(len);
        Ok(true)
    }

    /// Run an eviction pass without writing.
    pub fn gc(&self) -> Result<EvictionResult, ImageCacheError> {
        let mut size = self.size_bytes.lock();
        self.evict_locked(&mut size, self.max_size_bytes)
    }

    pub fn size_bytes(&self) -> u64 {
        *self.size_bytes.lock()
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File backing `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.directory.join(format!("{:x}.{}", digest, ENTRY_EXTENSION))
    }

    /// Evict least recently modified entries until at most `budget` bytes remain.
    fn evict_locked(&self, size: &mut u64, budget: u64) -> Result<EvictionResult, ImageCacheError> {
        let start = Instant::now();
        let mut entries = self.scan()?;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        let mut result = EvictionResult::default();

        if total > budget {
            entries.sort_by_key(|e| e.modified);
            for entry in entries {
                if total <= budget {
                    break;
                }
                match fs::remove_file(&entry.path) {
                    Ok(()) => {
                        total -= entry.size;
                        result.entries_removed += 1;
                        result.bytes_freed += entry.size;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        total -= entry.size;
                    }
                    Err(e) => {
                        warn!(
                            path = %entry.path.display(),
                            error = %e,
                            "Failed to evict cache entry"
                        );
                    }
                }
            }
        }

        *size = total;
        result.duration_ms = start.elapsed().as_millis() as u64;

        if result.entries_removed > 0 {
            debug!(
                entries_removed = result.entries_removed,
                bytes_freed = result.bytes_freed,
                size_bytes = total,
                "Disk image cache evicted entries"
            );
        }
        Ok(result)
    }

    fn scan(&self) -> io::Result<Vec<DiskEntry>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.directory)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let meta = dir_entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            entries.push(DiskEntry {
                path,
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(entries)
    }
}

/// Delete `*.tmp` files left by writes that never reached their rename.
fn remove_stale_temps(directory: &Path) -> io::Result<()> {
    let mut removed = 0usize;
    for dir_entry in fs::read_dir(directory)? {
        let path = dir_entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TEMP_EXTENSION) || !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    if removed > 0 {
        debug!(removed, directory = %directory.display(), "Removed stale temp files");
    }
    Ok(())
}

fn touch(path: &Path) -> io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn age(cache: &DiskImageCache, key: &str, secs_ago: i64) {
        let now = FileTime::now();
        let when = FileTime::from_unix_time(now.unix_seconds() - secs_ago, 0);
        set_file_mtime(cache.entry_path(key), when).unwrap();
    }

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path().join("images"), 1024).unwrap();

        cache.put("https://example.com/a.png", &[1, 2, 3]).unwrap();

        assert_eq!(
            cache.get("https://example.com/a.png").unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(cache.get("https://example.com/b.png").unwrap(), None);
        assert_eq!(cache.size_bytes(), 3);
    }

    #[test]
    fn test_entry_names_are_sha256() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 1024).unwrap();
        let name = cache
            .entry_path("key")
            .file_stem()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_rejects_entry_larger_than_ceiling() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 10).unwrap();

        let err = cache.put("big", &[0u8; 11]).unwrap_err();
        assert!(matches!(
            err,
            ImageCacheError::EntryTooLarge { size: 11, max: 10 }
        ));
        assert_eq!(cache.get("big").unwrap(), None);
    }

    #[test]
    fn test_evicts_least_recently_modified() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 250).unwrap();

        cache.put("oldest", &[0u8; 100]).unwrap();
        cache.put("middle", &[0u8; 100]).unwrap();
        age(&cache, "oldest", 300);
        age(&cache, "middle", 200);

        let result = cache.put("newest", &[0u8; 100]).unwrap();

        assert_eq!(result.entries_removed, 1);
        assert_eq!(result.bytes_freed, 100);
        assert_eq!(cache.get("oldest").unwrap(), None);
        assert!(cache.get("middle").unwrap().is_some());
        assert!(cache.get("newest").unwrap().is_some());
        assert!(cache.size_bytes() <= cache.max_size_bytes());
    }

    #[test]
    fn test_read_refreshes_recency() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 250).unwrap();

        cache.put("first", &[0u8; 100]).unwrap();
        cache.put("second", &[0u8; 100]).unwrap();
        age(&cache, "first", 300);
        age(&cache, "second", 200);

        // Reading "first" makes "second" the eviction candidate.
        cache.get("first").unwrap();
        cache.put("third", &[0u8; 100]).unwrap();

        assert!(cache.get("first").unwrap().is_some());
        assert_eq!(cache.get("second").unwrap(), None);
    }

    #[test]
    fn test_open_trims_existing_directory() {
        let dir = TempDir::new().unwrap();
        {
            let cache = DiskImageCache::open(dir.path(), 1_000).unwrap();
            for i in 0..5 {
                cache.put(&format!("entry-{}", i), &[0u8; 200]).unwrap();
            }
            assert_eq!(cache.size_bytes(), 1_000);
        }

        let cache = DiskImageCache::open(dir.path(), 500).unwrap();
        assert!(cache.size_bytes() <= 500);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), vec![0u8; 4096]).unwrap();

        let cache = DiskImageCache::open(dir.path(), 100).unwrap();
        assert_eq!(cache.size_bytes(), 0);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 1024).unwrap();

        cache.put("key", &[1, 2, 3, 4]).unwrap();
        assert!(cache.remove("key").unwrap());
        assert!(!cache.remove("key").unwrap());
        assert_eq!(cache.size_bytes(), 0);
    }

    fn bytes_on_disk(dir: &Path) -> u64 {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().metadata().unwrap().len())
            .sum()
    }

    #[test]
    fn test_open_removes_stale_temp_files() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("deadbeef.tmp");
        fs::write(&stale, vec![0u8; 4096]).unwrap();

        let cache = DiskImageCache::open(dir.path(), 1024).unwrap();
        cache.put("k", &[0u8; 1000]).unwrap();

        assert!(!stale.exists());
        assert_eq!(cache.size_bytes(), 1000);
        assert_eq!(bytes_on_disk(dir.path()), 1000);
    }

    #[test]
    fn test_evicts_before_writing() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 300).unwrap();

        cache.put("a", &[0u8; 150]).unwrap();
        cache.put("b", &[0u8; 150]).unwrap();
        age(&cache, "a", 100);

        let result = cache.put("c", &[0u8; 150]).unwrap();

        assert_eq!(result.entries_removed, 1);
        assert_eq!(cache.get("a").unwrap(), None);
        assert_eq!(bytes_on_disk(dir.path()), 300);
        assert_eq!(cache.size_bytes(), 300);
    }

    #[test]
    fn test_replacing_entry_keeps_size_accurate() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::open(dir.path(), 1024).unwrap();

        cache.put("key", &[0u8; 600]).unwrap();
        let result = cache.put("key", &[1u8; 700]).unwrap();

        assert_eq!(result.entries_removed, 0);
        assert_eq!(cache.size_bytes(), 700);
        assert_eq!(cache.get("key").unwrap(), Some(vec![1u8; 700]));
        assert_eq!(bytes_on_disk(dir.path()), 700);
    }
}

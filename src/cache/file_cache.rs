//! Local File Cache
//!
//! Shared context for every `CachedFile`: where cached copies live, how much
//! disk headroom must remain, and what to call on a cache hit.
//!
//! Every operation here is best-effort. Failures are logged and reported as
//! "not cached"; they never reach the caller of a read.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::key;
use super::space::{HeadroomPolicy, SpaceProbe, StatvfsProbe};
use crate::backend::Backend;
use crate::cached_file::CachedFile;
use crate::config::CacheConfig;

/// Prefix of in-flight cache writes; cache file names never start with `.`
const TEMP_PREFIX: &str = ".cachedfile-";
const TEMP_SUFFIX: &str = ".tmp";

/// Temp files older than this are leftovers from a crashed writer
const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Callback invoked with the id on every cache hit
pub type HitHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Local disk cache shared by `CachedFile` instances
pub struct FileCache {
    /// Root directory for cached files
    cache_dir: PathBuf,
    /// Free-space requirement for new entries
    headroom: HeadroomPolicy,
    /// Measures free space on the cache filesystem
    probe: Arc<dyn SpaceProbe>,
    /// Called on each cache hit (no-op by default)
    on_hit: HitHook,
}

impl FileCache {
    /// Create a file cache from configuration
    ///
    /// Creating the directory and sweeping stale temp files are attempted
    /// here, but failure only disables caching in practice; reads still
    /// work through the backend.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Self {
            cache_dir: config.cache_root.clone(),
            headroom: config.headroom(),
            probe: Arc::new(StatvfsProbe),
            on_hit: Arc::new(|_: &str| {}),
        };

        if let Err(e) = fs::create_dir_all(&cache.cache_dir) {
            warn!(
                cache_dir = %cache.cache_dir.display(),
                error = %e,
                "Failed to create cache directory, entries will not be cached"
            );
        } else {
            cache.cleanup();
        }

        info!(
            cache_dir = %cache.cache_dir.display(),
            min_free_ratio = cache.headroom.min_free_ratio,
            accounting = ?cache.headroom.accounting,
            "File cache initialized"
        );

        cache
    }

    /// Replace the free-space probe
    pub fn with_space_probe<P: SpaceProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Install a hook called with the id on each cache hit
    pub fn on_hit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_hit = Arc::new(hook);
        self
    }

    /// Bind `id` in `backend` to this cache. Performs no I/O.
    pub fn open(self: &Arc<Self>, backend: Arc<dyn Backend>, id: impl Into<String>) -> CachedFile {
        CachedFile::new(Arc::clone(self), backend, id)
    }

    /// Location of the cached copy for `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.cache_dir.join(key::file_name(id))
    }

    /// Open the cached copy of `id` if one exists and is readable
    pub fn open_cached(&self, id: &str) -> Option<File> {
        let local_path = self.path_for(id);

        match fs::metadata(&local_path) {
            Ok(metadata) if metadata.is_file() => {}
            _ => return None,
        }

        match File::open(&local_path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    id = id,
                    local = %local_path.display(),
                    error = %e,
                    "Cached copy unreadable, treating as miss"
                );
                None
            }
        }
    }

    pub(crate) fn record_hit(&self, id: &str) {
        (self.on_hit)(id);
    }

    /// Size of the cached copy of `id`, if present
    pub fn cached_len(&self, id: &str) -> Option<u64> {
        match fs::metadata(self.path_for(id)) {
            Ok(metadata) if metadata.is_file() => Some(metadata.len()),
            _ => None,
        }
    }

    /// Copy `src` into the cache as the entry for `id`
    ///
    /// Empty sources are skipped, as are writes that would break the
    /// headroom policy. `src` is read from its start; its position
    /// afterwards is unspecified. Returns whether an entry was written.
    pub fn populate(&self, id: &str, src: &mut File) -> bool {
        let size = match src.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(id = id, error = %e, "Failed to stat source, skipping cache write");
                return false;
            }
        };

        if size == 0 {
            return false;
        }

        if let Err(e) = fs::create_dir_all(&self.cache_dir) {
            warn!(
                cache_dir = %self.cache_dir.display(),
                error = %e,
                "Failed to create cache directory, skipping cache write"
            );
            return false;
        }

        match self.probe.measure(&self.cache_dir) {
            Ok(space) if self.headroom.permits(space, size) => {}
            Ok(space) => {
                debug!(
                    id = id,
                    size = size,
                    available = space.available,
                    total = space.total,
                    "Not enough disk headroom, skipping cache write"
                );
                return false;
            }
            Err(e) => {
                warn!(id = id, error = %e, "Failed to measure free space, skipping cache write");
                return false;
            }
        }

        match self.store(id, src) {
            Ok(local_path) => {
                debug!(
                    id = id,
                    local = %local_path.display(),
                    size = size,
                    "Stored file in cache"
                );
                true
            }
            Err(e) => {
                warn!(id = id, error = %e, "Failed to store file in cache");
                false
            }
        }
    }

    /// Write atomically: copy into a sibling temp file, sync, then rename
    fn store(&self, id: &str, src: &mut File) -> io::Result<PathBuf> {
        let local_path = self.path_for(id);

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.cache_dir)?;

        src.rewind()?;
        io::copy(src, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        tmp.persist(&local_path).map_err(|e| e.error)?;
        Ok(local_path)
    }

    /// Remove the cached copy of `id`; returns whether one was removed
    pub fn purge(&self, id: &str) -> bool {
        let local_path = self.path_for(id);
        match fs::remove_file(&local_path) {
            Ok(()) => {
                debug!(id = id, "Purged cached file");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(id = id, local = %local_path.display(), error = %e, "Failed to purge cached file");
                false
            }
        }
    }

    /// Remove temp files left behind by interrupted writers
    ///
    /// Only files older than an hour are touched so writers still in
    /// progress in other processes keep their temp file.
    pub fn cleanup(&self) -> usize {
        self.cleanup_older_than(STALE_TEMP_AGE)
    }

    fn cleanup_older_than(&self, max_age: Duration) -> usize {
        let Ok(read_dir) = fs::read_dir(&self.cache_dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in read_dir.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(TEMP_PREFIX) || !name.ends_with(TEMP_SUFFIX) {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            if !matches!(age, Some(age) if age >= max_age) {
                continue;
            }

            let path = entry.path();
            debug!(path = %path.display(), "Removing stale temp file");
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn headroom(&self) -> HeadroomPolicy {
        self.headroom
    }
}

impl fmt::Debug for FileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCache")
            .field("cache_dir", &self.cache_dir)
            .field("headroom", &self.headroom)
            .finish_non_exhaustive()
    }
}

use crate::core::cache::CacheKey;
use crate::core::error::Error;
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::future::Future;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::debug;

/// File-per-entry memoization cache.
///
/// Each entry lives at `<dir>/<operation>.<sha256>.json` and is fresh while
/// its modification time is younger than `expiration`. Entries are never
/// evicted here; expired ones are simply recomputed and overwritten.
///
/// There is no locking. Two concurrent misses on the same key both compute
/// and the last writer wins.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    expiration: Duration,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, expiration: Duration) -> Self {
        Self {
            dir: dir.into(),
            expiration,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Returns the memoized result of `operation(args)`, running `compute`
    /// on a miss, on expiry, or when `force_refresh` is set.
    ///
    /// Failures from `compute` are returned as is and leave the cache
    /// untouched. A corrupt entry is reported as [`Error::CorruptCacheEntry`]
    /// rather than recomputed; pass `force_refresh` to overwrite it.
    pub async fn cached_call<A, T, F, Fut>(
        &self,
        operation: &str,
        args: &A,
        force_refresh: bool,
        compute: F,
    ) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = CacheKey::new(operation, args)?;
        let path = self.entry_path(&key);

        if force_refresh {
            debug!("Cache BYPASS for {}", key.file_name());
        } else if let Some(value) = self.read_fresh(&path)? {
            debug!("Cache HIT for {}", key.file_name());
            return Ok(value);
        } else {
            debug!("Cache MISS for {}", key.file_name());
        }

        let value = compute().await?;
        self.write(&path, &value)?;
        debug!("Cache PUT for {}", key.file_name());
        Ok(value)
    }

    fn read_fresh<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let modified = match fs::metadata(path) {
            Ok(meta) => meta
                .modified()
                .with_context(|| format!("Failed to read mtime of {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
            }
        };

        // An mtime in the future counts as just written
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.expiration {
            debug!("Cache entry expired: {} (age {:?})", path.display(), age);
            return Ok(None);
        }

        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_slice(&bytes).map_err(|source| Error::CorruptCacheEntry {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(value))
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir: {}", self.dir.display()))?;
        let bytes = serde_json::to_vec(value)?;

        // Readers only ever see a complete entry or none
        let mut staged = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to stage cache entry in {}", self.dir.display()))?;
        staged
            .write_all(&bytes)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))?;
        staged
            .persist(path)
            .with_context(|| format!("Failed to replace cache entry: {}", path.display()))?;
        Ok(())
    }

    /// Removes every entry file and returns how many were deleted. Files
    /// not named like an entry are left alone.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list {}", self.dir.display()));
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let is_entry = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(CacheKey::is_entry_file_name);
            if !is_entry || !path.is_file() {
                continue;
            }
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
        debug!("Cache CLEAR removed {} entries", removed);
        Ok(removed)
    }
}

//! Filesystem cache store.
//!
//! One JSON file per key under a user-private directory (mode 0700, files
//! 0600). Opening the store removes entries whose TTL has run out, so an
//! entry that is never read again does not outlive its TTL by more than one
//! invocation. Deleting the directory purges the cache completely.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::store::CacheStore;
use super::{CacheEntry, Clock, SystemClock};
use crate::error::{CacheError, Result};

const ENTRY_EXT: &str = "json";

/// Cache store rooted at a private directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the store at `dir` and drop entries that
    /// expired by the wall clock.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Directory` if the directory cannot be created or
    /// restricted to the current user.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_at(dir, SystemClock.now())
    }

    /// Like [`FileStore::open`], judging expiry at `now`.
    pub fn open_at(dir: impl Into<PathBuf>, now: u64) -> Result<Self> {
        let dir = dir.into();
        create_private_dir(&dir).map_err(|source| CacheError::Directory {
            path: dir.clone(),
            source,
        })?;
        let store = Self { dir };
        let purged = store.purge_expired(now)?;
        debug!(dir = %store.dir.display(), purged, "cache store opened");
        Ok(store)
    }

    /// Store location.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXT))
    }

    fn read_entry(path: &Path) -> Option<CacheEntry> {
        let contents = fs::read(path).ok()?;
        match serde_json::from_slice(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding corrupt cache entry");
                let _ = fs::remove_file(path);
                None
            }
        }
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Create `dir` with mode 0700 and tighten it if it already exists.
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Self::read_entry(&path))
    }

    fn put(&self, entry: CacheEntry) -> Result<()> {
        create_private_dir(&self.dir).map_err(|source| CacheError::Directory {
            path: self.dir.clone(),
            source,
        })?;

        let data = serde_json::to_vec(&entry)?;

        // NamedTempFile is created 0600 on Unix.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(CacheError::Write)?;
        tmp.write_all(&data).map_err(CacheError::Write)?;
        tmp.as_file().sync_all().map_err(CacheError::Write)?;
        tmp.persist(self.path_for(&entry.key))
            .map_err(|e| CacheError::Write(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Write(e).into()),
        }
    }

    fn clear(&self) -> Result<usize> {
        let count = self.entry_paths()?.len();
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|source| CacheError::Directory {
                path: self.dir.clone(),
                source,
            })?;
        }
        debug!(dir = %self.dir.display(), removed = count, "cache purged");
        Ok(count)
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self
            .entry_paths()?
            .iter()
            .filter_map(|p| Self::read_entry(p))
            .collect())
    }
}

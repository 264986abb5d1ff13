//! Cache storage backends.
//!
//! ## Adding a New Store
//!
//! 1. Implement the `CacheStore` trait
//! 2. Add the implementation in a new file (e.g., `keyring.rs`)
//! 3. Re-export from the cache module

use std::collections::HashMap;
use std::sync::Mutex;

use super::CacheEntry;
use crate::error::{CacheError, Result};

/// Key/value storage for cache entries.
///
/// Holds at most one entry per key; `put` replaces.
pub trait CacheStore: Send + Sync {
    /// Fetch an entry, expired or not.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry.
    fn put(&self, entry: CacheEntry) -> Result<()>;

    /// Remove one entry. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every entry. Returns how many were removed.
    fn clear(&self) -> Result<usize>;

    /// All entries currently stored.
    fn entries(&self) -> Result<Vec<CacheEntry>>;

    /// Remove every entry that is no longer live at `now`. Returns how many
    /// were removed.
    fn purge_expired(&self, now: u64) -> Result<usize> {
        let mut removed = 0;
        for entry in self.entries()? {
            if !entry.is_live(now) {
                self.remove(&entry.key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.values().cloned().collect())
    }
}

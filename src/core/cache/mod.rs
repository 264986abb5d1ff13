//! Secret cache.
//!
//! Memoizes provider lookups for a short time-to-live so one batch run that
//! references the same secret from many templates pays for one subprocess
//! call. Entries expire lazily: a read past `created_at + ttl_secs` is a
//! miss and the fresh value overwrites the stale entry. Stale entries that
//! are never read again are swept when the store is opened and by
//! [`CacheManager::status`]. Failures are never cached.
//!
//! Concurrent callers for the same key are serialized so at most one
//! resolution per key is in flight; different keys proceed in parallel.

mod fs;
mod store;

pub use fs::FileStore;
pub use store::{CacheStore, MemoryStore};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

use crate::core::config::Settings;
use crate::core::constants;
use crate::core::reference::Lookup;
use crate::core::resolver::Resolved;
use crate::core::types::SecretValue;
use crate::error::{CacheError, Error, ResolveError, Result};

/// One cached secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: SecretValue,
    /// Account the value was resolved through.
    pub account: Option<String>,
    /// Unix seconds.
    pub created_at: u64,
    pub ttl_secs: u64,
}

impl CacheEntry {
    /// Whether the entry is still valid at `now`.
    pub fn is_live(&self, now: u64) -> bool {
        now < self.created_at.saturating_add(self.ttl_secs)
    }
}

/// Time source, in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Summary of a warm-up pass.
#[derive(Debug, Default, Serialize)]
pub struct WarmReport {
    /// Entries freshly resolved.
    pub resolved: usize,
    /// Entries that were already live.
    pub cached: usize,
    /// References that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Counts reported by `cache status`.
#[derive(Debug, Default, Serialize)]
pub struct CacheStatus {
    pub enabled: bool,
    pub live: usize,
    /// Expired entries removed while taking the count.
    pub purged: usize,
}

/// TTL-bounded cache in front of the resolver.
pub struct CacheManager {
    store: Box<dyn CacheStore>,
    enabled: bool,
    ttl_secs: u64,
    clock: Box<dyn Clock>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheManager {
    /// Enabled cache over `store` with the default TTL.
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            enabled: true,
            ttl_secs: constants::DEFAULT_TTL_SECS,
            clock: Box::new(SystemClock),
            inflight: DashMap::new(),
        }
    }

    /// Cache that never stores anything and always calls the resolver.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(MemoryStore::new())
        }
    }

    /// Build from settings: a [`FileStore`] in the cache directory, or a
    /// disabled cache.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Directory` if the cache directory is unusable.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if !settings.cache.enabled {
            debug!("cache disabled");
            return Ok(Self::disabled());
        }
        let store = FileStore::open(settings.cache_dir()?)?;
        Ok(Self::new(store).with_ttl(settings.cache.ttl_secs))
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Default TTL for new entries.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    fn live(&self, key: &str) -> Result<Option<Resolved>> {
        let Some(entry) = self.store.get(key)? else {
            return Ok(None);
        };
        if !entry.is_live(self.clock.now()) {
            trace!(key, "cache entry expired");
            self.store.remove(key)?;
            return Ok(None);
        }
        Ok(Some(Resolved {
            value: entry.value,
            account: entry.account,
            tried: Vec::new(),
            cached: true,
        }))
    }

    /// Return the live cached value for `lookup`, or call `resolve_fn` and
    /// cache its result.
    ///
    /// Successful resolutions are stored with `created_at = now`; failures
    /// are returned without touching the store.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error wrapped in `Error::Resolve`, or a
    /// `CacheError` if the store cannot be read or written.
    pub fn get_or_resolve<F>(&self, lookup: &Lookup, ttl_secs: u64, resolve_fn: F) -> Result<Resolved>
    where
        F: FnOnce() -> std::result::Result<Resolved, ResolveError>,
    {
        if !self.enabled {
            return resolve_fn().map_err(Error::from);
        }

        let key = lookup.key();
        if let Some(hit) = self.live(key)? {
            trace!(key, "cache hit");
            return Ok(hit);
        }

        // Serialize resolution per key. Later callers block here and then
        // find the first caller's entry.
        let lock = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = match lock.lock() {
            Ok(_guard) => self.resolve_locked(key, ttl_secs, resolve_fn),
            Err(_) => Err(CacheError::Poisoned.into()),
        };

        // Last holder out removes the lock; waiters still hold a clone.
        drop(lock);
        self.inflight
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    fn resolve_locked<F>(&self, key: &str, ttl_secs: u64, resolve_fn: F) -> Result<Resolved>
    where
        F: FnOnce() -> std::result::Result<Resolved, ResolveError>,
    {
        if let Some(hit) = self.live(key)? {
            trace!(key, "cache hit after wait");
            return Ok(hit);
        }

        trace!(key, "cache miss");
        let resolved = resolve_fn()?;
        self.store.put(CacheEntry {
            key: key.to_string(),
            value: resolved.value.clone(),
            account: resolved.account.clone(),
            created_at: self.clock.now(),
            ttl_secs,
        })?;
        Ok(resolved)
    }

    /// Pre-populate the cache for `lookups`.
    ///
    /// Per-reference failures are collected; only environment-level errors
    /// (provider unavailable, store unwritable) abort.
    pub fn warm<F>(&self, lookups: &[Lookup], resolve_fn: F) -> Result<WarmReport>
    where
        F: Fn(&Lookup) -> std::result::Result<Resolved, ResolveError>,
    {
        let mut report = WarmReport::default();
        for lookup in lookups {
            match self.get_or_resolve(lookup, self.ttl_secs, || resolve_fn(lookup)) {
                Ok(resolved) if resolved.cached => report.cached += 1,
                Ok(_) => report.resolved += 1,
                Err(Error::Resolve(ResolveError::ProviderUnavailable(reason))) => {
                    return Err(ResolveError::ProviderUnavailable(reason).into());
                }
                Err(Error::Resolve(err)) => {
                    report
                        .failed
                        .push((lookup.reference.to_string(), err.to_string()));
                }
                Err(other) => return Err(other),
            }
        }
        debug!(
            resolved = report.resolved,
            cached = report.cached,
            failed = report.failed.len(),
            "cache warmed"
        );
        Ok(report)
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<usize> {
        self.store.clear()
    }

    /// Remove entries past their TTL.
    pub fn purge_expired(&self) -> Result<usize> {
        let purged = self.store.purge_expired(self.clock.now())?;
        if purged > 0 {
            debug!(purged, "expired cache entries removed");
        }
        Ok(purged)
    }

    /// Live entry count, after removing expired entries.
    pub fn status(&self) -> Result<CacheStatus> {
        let purged = self.purge_expired()?;
        Ok(CacheStatus {
            enabled: self.enabled,
            live: self.store.entries()?.len(),
            purged,
        })
    }
}

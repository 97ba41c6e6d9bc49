//! Memoization of combined results with single-flight semantics.
//!
//! The first request for an input inserts a shared, lazily-driven
//! computation; every later request for that input, concurrent or not,
//! awaits the same computation. The computation closure is therefore invoked
//! at most once per key for the life of the cache.
//!
//! ```text
//! combine(5) ─┐ miss: insert Shared(fut)            ┌──► CombinedResult { cached: false }
//!             ├──► ResultCache ──► one computation ─┤
//! combine(5) ─┘ hit: clone Shared(fut)              └──► CombinedResult { cached: true }
//! ```
//!
//! Entries are only removed by [`ResultCache::clear`].

use crate::outcome::{CombineAbort, CombinedResult, Outcome};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// What a computation resolves to: an outcome, or the reason it was aborted.
pub type CachedValue = Result<Outcome, CombineAbort>;

type SharedComputation = Shared<BoxFuture<'static, CachedValue>>;

/// Statistics for monitoring cache effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total lookups.
    pub requests: u64,
    /// Lookups answered by an existing entry (complete or in flight).
    pub hits: u64,
    /// Lookups that started a computation.
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
}

impl CacheStats {
    /// Returns the hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

/// Input → combined-result memo table.
pub struct ResultCache {
    entries: DashMap<i64, SharedComputation>,
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the result for `key`, running `computation` only if no entry
    /// exists yet.
    ///
    /// The request that inserts the entry gets `served_from_cache = false`;
    /// all others get `true`, including those that join a computation still
    /// in flight.
    pub async fn get_or_compute<C>(&self, key: i64, computation: C) -> Result<CombinedResult, CombineAbort>
    where
        C: FnOnce() -> BoxFuture<'static, CachedValue>,
    {
        let (shared, hit) = self.lookup(key, computation);
        let outcome = shared.await?;
        Ok(if hit {
            CombinedResult::cached(outcome)
        } else {
            CombinedResult::computed(outcome)
        })
    }

    /// Atomic check-and-insert. The map guard is released before returning
    /// so callers never await while holding a shard lock.
    fn lookup<C>(&self, key: i64, computation: C) -> (SharedComputation, bool)
    where
        C: FnOnce() -> BoxFuture<'static, CachedValue>,
    {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache hit");
                (entry.get().clone(), true)
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let shared = computation().shared();
                entry.insert(shared.clone());
                trace!(key, "Cache miss, computation registered");
                (shared, false)
            }
        }
    }

    /// Returns true if an entry (complete or in flight) exists for `key`.
    pub fn contains(&self, key: i64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discards every entry and zeroes the statistics.
    ///
    /// Only valid when no caller is still waiting on an entry from before the
    /// reset.
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.requests.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!(dropped, "Result cache cleared");
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

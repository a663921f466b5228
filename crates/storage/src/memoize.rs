//! Keyed memoization of asynchronous loads.
//!
//! Every key maps to one shared future. Concurrent and later callers of the
//! same key await that future instead of starting another load, and they all
//! observe the same result, failures included. Cancelled loads are the one
//! exception: they are evicted so the next caller loads again.

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::LoadError;

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, LoadError>>>;

/// Default number of keys kept by [`Memoized::default`].
const DEFAULT_CAPACITY: usize = 512;

/// Counters for a memoized cache.
#[derive(Debug, Default)]
pub struct LoaderStats {
    /// Calls served by an existing entry
    pub hits: AtomicU64,
    /// Calls that started a load
    pub misses: AtomicU64,
    /// Entries removed because their load was cancelled
    pub evictions: AtomicU64,
}

impl LoaderStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// A keyed cache of shared loads, bounded by LRU eviction.
pub struct Memoized<T: Clone + Send + Sync + 'static> {
    entries: Arc<Mutex<LruCache<String, SharedLoad<T>>>>,
    stats: Arc<LoaderStats>,
}

impl<T: Clone + Send + Sync + 'static> Clone for Memoized<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Memoized<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: Clone + Send + Sync + 'static> Memoized<T> {
    /// Create a cache holding at most `capacity` keys (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            stats: Arc::new(LoaderStats::default()),
        }
    }

    /// Return the result for `key`, starting `load` only if no entry exists.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> Result<T, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().await;
            match entries.get(key) {
                Some(existing) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Loader cache hit");
                    existing.clone()
                }
                None => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Loader cache miss");
                    let shared = load().boxed().shared();
                    entries.put(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;
        if matches!(&result, Err(e) if e.is_cancelled()) {
            self.evict_if_same(key, &shared).await;
        }
        result
    }

    /// Remove `key` only if it still maps to `shared`; a newer load that
    /// replaced it stays.
    async fn evict_if_same(&self, key: &str, shared: &SharedLoad<T>) {
        let mut entries = self.entries.lock().await;
        if entries
            .peek(key)
            .is_some_and(|current| Shared::ptr_eq(current, shared))
        {
            entries.pop(key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Evicted cancelled load");
        }
    }

    /// Drop every entry whose load has not finished yet.
    ///
    /// Returns the number of entries removed.
    pub async fn evict_pending(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let pending: Vec<String> = entries
            .iter()
            .filter(|(_, shared)| shared.peek().is_none())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &pending {
            entries.pop(key);
        }
        self.stats
            .evictions
            .fetch_add(pending.len() as u64, Ordering::Relaxed);
        pending.len()
    }

    /// Remove one key.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }

    /// Remove every key.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }
}

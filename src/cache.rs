//! Memoization of per-configuration values.

use crate::settings::key::CacheKey;

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;

/// Entries kept by [KeyedCache::new].
pub const CACHE_SIZE: usize = 128;

/// A bounded map from [CacheKey] to values built at most once per key while
/// they stay cached.
///
/// Parsers and other objects that are costly to set up can be kept here, keyed
/// by the overlay they were built for. When full, the least recently used
/// entry is dropped; callers still holding its `Arc` keep their value.
pub struct KeyedCache<T> {
    entries: Mutex<LruCache<CacheKey, Arc<T>>>,
}

impl<T> Default for KeyedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyedCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(
                NonZeroUsize::new(CACHE_SIZE).map_or_else(LruCache::unbounded, LruCache::new),
            ),
        }
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).cap()
    }

    /// Returns the value stored under `key`, building and storing it first if
    /// there is none. A failed build stores nothing.
    ///
    /// The lock is held while `build` runs, so `build` must not use this cache.
    pub fn get_or_try_insert_with<E, F>(&self, key: &CacheKey, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        // Entries are only ever inserted whole.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(value) = entries.get(key) {
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(build()?);
        tracing::trace!(%key, "cached new entry");
        if let Some((evicted, _)) = entries.push(key.clone(), Arc::clone(&value)) {
            tracing::trace!(key = %evicted, "evicted least recently used entry");
        }
        Ok(value)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

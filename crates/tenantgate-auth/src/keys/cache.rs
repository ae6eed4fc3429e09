//! Bounded, TTL-based LRU cache for resolved verification keys.
//!
//! The cache maps a [`CacheKey`] (`issuer|audience`) to the [`KeyMaterial`]
//! resolved for it. Capacity is accounted in units of key size (bytes of a
//! secret, characters of a PEM), not in entry count.
//!
//! # Expiry
//!
//! Entries older than the TTL are never returned. Expiry is lazy: an expired
//! entry is dropped when a read observes it, or evicted as least recently
//! used when space is needed.
//!
//! # Locking
//!
//! All operations are synchronous and take a `parking_lot::Mutex` for their
//! whole duration. Callers never hold the lock across an `.await`.

use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::types::{CacheKey, KeyMaterial};

/// Default capacity: 5M units (the original sizing assumed ~10 MB of text).
pub const DEFAULT_CAPACITY: usize = 1024 * 1024 * 5;

/// Default time-to-live of a cached key.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Configuration for the key cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyCacheConfig {
    /// Maximum aggregate size of cached values.
    pub capacity: usize,

    /// How long an entry stays valid after insertion.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

impl KeyCacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

struct CacheEntry {
    value: KeyMaterial,
    inserted_at: Instant,
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    weighted_size: usize,
}

impl CacheState {
    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.weighted_size -= entry.value.size();
        Some(entry)
    }
}

/// In-memory key cache shared by all verification calls of a process.
///
/// Constructed empty and injected where needed; there is no global instance.
pub struct KeyCache {
    state: Mutex<CacheState>,
    config: KeyCacheConfig,
}

impl KeyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: KeyCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                weighted_size: 0,
            }),
            config,
        }
    }

    /// Creates an empty cache with default capacity and TTL.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(KeyCacheConfig::default())
    }

    /// Returns the cache configuration.
    #[must_use]
    pub fn config(&self) -> &KeyCacheConfig {
        &self.config
    }

    /// Looks up a key, marking it as recently used on a hit.
    ///
    /// Returns `None` for missing and expired entries.
    pub fn get(&self, key: &CacheKey) -> Option<KeyMaterial> {
        let mut state = self.state.lock();

        let expired = state
            .entries
            .peek(key)
            .map(|entry| entry.inserted_at.elapsed() > self.config.ttl)?;

        if expired {
            state.remove(key);
            tracing::trace!(cache_key = %key, "Expired key cache entry dropped");
            return None;
        }

        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts or replaces a key, evicting least recently used entries until
    /// the new value fits.
    ///
    /// A value larger than the whole capacity is not cached.
    pub fn set(&self, key: CacheKey, value: KeyMaterial) {
        let size = value.size();
        let mut state = self.state.lock();

        state.remove(&key);

        if size > self.config.capacity {
            tracing::warn!(
                cache_key = %key,
                size,
                capacity = self.config.capacity,
                "Key exceeds cache capacity, not cached"
            );
            return;
        }

        let mut evicted = 0usize;
        while state.weighted_size + size > self.config.capacity {
            match state.entries.pop_lru() {
                Some((_, entry)) => {
                    state.weighted_size -= entry.value.size();
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted least recently used keys");
        }

        state.weighted_size += size;
        state.entries.put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes a key.
    pub fn remove(&self, key: &CacheKey) -> Option<KeyMaterial> {
        self.state.lock().remove(key).map(|entry| entry.value)
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.weighted_size = 0;
    }

    /// Number of stored entries, including expired ones not yet dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Aggregate size of stored values.
    #[must_use]
    pub fn weighted_size(&self) -> usize {
        self.state.lock().weighted_size
    }
}

//! Time-bounded cache for provider metadata.
//!
//! Used for discovery documents (keyed by tenant id) and key sets (keyed by
//! `jwks_uri`). A cache built without a TTL stores nothing, so every lookup
//! goes to the provider.
//!
//! # Invariants
//! - An entry is returned only while it is younger than the TTL.
//! - Locks are held only for the duration of a map operation, never across an `.await`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CachedEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Cache of provider responses with a fixed time-to-live.
///
/// # Thread Safety
///
/// Uses `RwLock` so concurrent validations can read the same entry. A poisoned
/// lock behaves like an empty cache.
pub struct MetadataCache<V> {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<String, CachedEntry<V>>>,
}

impl<V: Clone> MetadataCache<V> {
    /// Create a cache. `None` disables caching.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    /// Get a fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        let ttl = self.ttl?;
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// Expired entries are swept on insert.
    pub fn insert(&self, key: &str, value: V) {
        let Some(ttl) = self.ttl else {
            return;
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
            entries.insert(
                key.to_string(),
                CachedEntry {
                    value,
                    fetched_at: Instant::now(),
                },
            );
        }
    }

    /// Remove the entry for `key`. The next lookup misses.
    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

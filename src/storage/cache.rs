//! Quota-aware cache store over a [`StorageBackend`].
//!
//! This is the durability and offline-read layer: writes are best effort and
//! never crash a calling operation, reads degrade to a caller-supplied
//! default on missing, corrupt, or unavailable storage.
//!
//! # Eviction
//! The only eviction rule in the system is count-bounded FIFO keyed on
//! reception order: a tracked collection whose item count exceeds
//! [`EVICTION_HIGH_WATER`] is trimmed to its [`EVICTION_LOW_WATER`] most
//! recent items (head retained, tail discarded) before the write. No TTL,
//! no access-time LRU.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::models::CachedCollection;
use crate::storage::backend::{StorageBackend, StorageError};

/// Item count above which a tracked collection is trimmed.
pub const EVICTION_HIGH_WATER: usize = 500;

/// Item count a trimmed collection is reduced to.
pub const EVICTION_LOW_WATER: usize = 300;

/// Generic get/set cache over the selected storage backend.
///
/// Shared by every repository and the session manager; keys are partitioned
/// per owner, so no cross-owner coordination is needed.
pub struct CacheStore {
    backend: Arc<dyn StorageBackend>,
}

impl CacheStore {
    /// Create a store over a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Whether the underlying backend survives restarts.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Best-effort write of a JSON-serializable value.
    ///
    /// On quota exhaustion the write is retried exactly once after trimming
    /// the value (when it is a tracked collection). A still-failing write is
    /// dropped and logged; callers are never interrupted by cache writes.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(json) = serde_json::to_string(value) else {
            tracing::warn!(key, "failed to serialize cache value; dropping write");
            return;
        };
        self.save_raw(key, json);
    }

    /// Read a value, returning `default` when the store is unavailable or
    /// the key is absent or corrupt. Corrupt entries are treated as absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.backend.read(key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key, error = %e, "corrupt cache entry; using default");
                    default
                }
            },
            None => default,
        }
    }

    /// Remove a key.
    pub fn remove(&self, key: &str) {
        self.backend.remove(key);
    }

    /// Write a tracked collection through to storage, applying the eviction
    /// policy when it is over the high-water mark.
    pub fn save_collection<T>(&self, collection: &CachedCollection<T>)
    where
        T: Serialize + Clone,
    {
        let trimmed;
        let to_write = if collection.items.len() > EVICTION_HIGH_WATER {
            tracing::debug!(
                key = %collection.key,
                count = collection.items.len(),
                retained = EVICTION_LOW_WATER,
                "trimming cached collection past high-water mark"
            );
            trimmed = trim(collection);
            &trimmed
        } else {
            collection
        };

        let Ok(json) = serde_json::to_string(to_write) else {
            tracing::warn!(key = %collection.key, "failed to serialize collection; dropping write");
            return;
        };

        match self.backend.write(&collection.key, &json) {
            Ok(()) => {}
            Err(StorageError::QuotaExceeded) => {
                // Evict down to the low-water mark, then retry exactly once.
                let evicted = trim(to_write);
                match serde_json::to_string(&evicted) {
                    Ok(json) => self.retry_write(&collection.key, &json),
                    Err(e) => {
                        tracing::warn!(key = %collection.key, error = %e, "dropping cache write");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(key = %collection.key, error = %e, "dropping cache write");
            }
        }
    }

    /// Read a tracked collection, or an empty one for the key.
    pub fn load_collection<T>(&self, key: &str) -> CachedCollection<T>
    where
        T: DeserializeOwned,
    {
        self.load(key, CachedCollection::empty(key))
    }

    fn save_raw(&self, key: &str, json: String) {
        match self.backend.write(key, &json) {
            Ok(()) => {}
            Err(StorageError::QuotaExceeded) => self.retry_write(key, &json),
            Err(e) => tracing::warn!(key, error = %e, "dropping cache write"),
        }
    }

    fn retry_write(&self, key: &str, json: &str) {
        if let Err(e) = self.backend.write(key, json) {
            tracing::warn!(key, error = %e, "cache write dropped after eviction retry");
        }
    }
}

/// Trim a collection to its most recent [`EVICTION_LOW_WATER`] items.
/// Items are head-newest, so the head is retained and the tail discarded.
fn trim<T: Clone>(collection: &CachedCollection<T>) -> CachedCollection<T> {
    let mut trimmed = CachedCollection {
        key: collection.key.clone(),
        items: collection.items.clone(),
        last_synced_at: collection.last_synced_at,
    };
    trimmed.items.truncate(EVICTION_LOW_WATER);
    trimmed
}

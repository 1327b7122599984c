//! Durable strategy cache - the long-lived tier of last-known responses.
//!
//! Stores the last resolved or failed [`ResponseData`] per (namespace, key).
//! Only strategies that opt in write here, and only through the gated
//! cache-write pipeline; the engine itself never expires entries.

use std::sync::Arc;

use crate::response::ResponseData;
use crate::storage::{namespaced_key, InMemoryStorage, KeyValueStorage};

/// Handle to the durable cache tier.
///
/// Cheap to clone; clones address the same underlying storage. Constructor
/// injection keeps tiers isolated between engine instances, so tests can run
/// side by side without cross-contamination.
pub struct StrategyCache<T> {
    storage: Arc<dyn KeyValueStorage<ResponseData<T>>>,
}

impl<T> Clone for StrategyCache<T> {
    fn clone(&self) -> Self {
        StrategyCache {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> StrategyCache<T> {
    /// Create a durable cache over the given storage medium.
    pub fn new(storage: Arc<dyn KeyValueStorage<ResponseData<T>>>) -> Self {
        StrategyCache { storage }
    }

    /// Create a durable cache over fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    /// Check whether the (namespace, key) slot is occupied.
    pub fn has(&self, cache_name: &str, key: &str) -> bool {
        self.storage.has(&namespaced_key(cache_name, key))
    }

    /// Read the last known response for the (namespace, key) slot.
    pub fn get(&self, cache_name: &str, key: &str) -> Option<ResponseData<T>> {
        self.storage.get(&namespaced_key(cache_name, key))
    }

    /// Overwrite the (namespace, key) slot.
    ///
    /// Callers other than the cache-write pipeline should not reach for this
    /// directly; `cache_data` is the gated write path.
    pub fn set(&self, cache_name: &str, key: &str, value: ResponseData<T>) {
        debug!("✓ StrategyCache SET {}:{}", cache_name, key);
        self.storage.set(&namespaced_key(cache_name, key), value);
    }
}

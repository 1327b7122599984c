//! Key/value storage contract and the default in-memory medium.
//!
//! Both cache tiers and the expiration plugin's side-table sit on top of the
//! same minimal synchronous contract, so any storage medium can back them.

use std::sync::Arc;

use dashmap::DashMap;

use crate::request::Key;

/// Minimal synchronous key/value contract any storage medium must satisfy.
///
/// No transactional guarantees are required; the engine layers its own
/// consistency on top. Implementations use interior mutability so every
/// method takes `&self`.
pub trait KeyValueStorage<V>: Send + Sync {
    /// Check if the key is occupied.
    fn has(&self, key: &str) -> bool;

    /// Retrieve the value for the key, or `None` on a miss.
    fn get(&self, key: &str) -> Option<V>;

    /// Store the value for the key, overwriting any previous value.
    fn set(&self, key: &str, value: V);

    /// Remove the value for the key.
    fn remove(&self, key: &str);
}

/// Thread-safe in-memory storage.
///
/// Uses DashMap for lock-free concurrent access with per-key sharding.
/// `Clone` shares the same underlying store.
pub struct InMemoryStorage<V> {
    store: Arc<DashMap<Key, V>>,
}

impl<V> InMemoryStorage<V> {
    pub fn new() -> Self {
        InMemoryStorage {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the storage holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<V> Default for InMemoryStorage<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for InMemoryStorage<V> {
    fn clone(&self) -> Self {
        InMemoryStorage {
            store: Arc::clone(&self.store),
        }
    }
}

impl<V: Clone + Send + Sync> KeyValueStorage<V> for InMemoryStorage<V> {
    fn has(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<V> {
        self.store.get(key).map(|entry| entry.clone())
    }

    fn set(&self, key: &str, value: V) {
        self.store.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.store.remove(key);
    }
}

/// Compose a namespace and a key into a single flat storage address.
///
/// Namespace + key is the true address in both cache tiers; a bare key is
/// not assumed unique across namespaces.
pub fn namespaced_key(cache_name: &str, key: &str) -> Key {
    format!("{}:{}", cache_name, key)
}

//! Transient resource cache - the tier of current operation state.
//!
//! Stores, per (namespace, key), the in-flight operation handle and the
//! settled response that drive the read path. Unlike the durable tier this
//! one is overwritten on every fetch attempt.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};

use crate::response::ResponseData;
use crate::storage::{namespaced_key, InMemoryStorage, KeyValueStorage};

/// A cloneable handle to an in-flight operation.
///
/// Every concurrent reader of the same key awaits the same shared future;
/// nothing here starts a duplicate fetch.
pub type Operation<T> = Shared<BoxFuture<'static, ResponseData<T>>>;

/// Current operation state for one (namespace, key) slot.
///
/// While `data` is absent, `instance` denotes the operation in flight; once
/// the operation settles, `data` is populated and `instance` is no longer
/// authoritative.
#[derive(Clone)]
pub struct ResourceEntry<T> {
    pub instance: Option<Operation<T>>,
    pub data: Option<ResponseData<T>>,
}

impl<T> ResourceEntry<T> {
    /// Entry for an operation still in flight.
    pub fn pending(instance: Operation<T>) -> Self {
        ResourceEntry {
            instance: Some(instance),
            data: None,
        }
    }

    /// Entry for a settled operation.
    pub fn settled(data: ResponseData<T>) -> Self {
        ResourceEntry {
            instance: None,
            data: Some(data),
        }
    }

    /// Whether the operation behind this entry has settled.
    pub fn is_settled(&self) -> bool {
        self.data.is_some()
    }
}

/// Handle to the transient cache tier.
///
/// Cheap to clone; clones address the same underlying storage.
pub struct ResourceCache<T> {
    storage: Arc<dyn KeyValueStorage<ResourceEntry<T>>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        ResourceCache {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ResourceCache<T> {
    /// Create a resource cache over the given storage medium.
    pub fn new(storage: Arc<dyn KeyValueStorage<ResourceEntry<T>>>) -> Self {
        ResourceCache { storage }
    }

    /// Create a resource cache over fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    /// Check whether the (namespace, key) slot is occupied.
    pub fn has(&self, cache_name: &str, key: &str) -> bool {
        self.storage.has(&namespaced_key(cache_name, key))
    }

    /// Read the current operation state for the (namespace, key) slot.
    pub fn get(&self, cache_name: &str, key: &str) -> Option<ResourceEntry<T>> {
        self.storage.get(&namespaced_key(cache_name, key))
    }

    /// Overwrite the (namespace, key) slot with new operation state.
    pub fn set(&self, cache_name: &str, key: &str, entry: ResourceEntry<T>) {
        self.storage.set(&namespaced_key(cache_name, key), entry);
    }

    /// Drop the (namespace, key) slot entirely.
    pub fn remove(&self, cache_name: &str, key: &str) {
        self.storage.remove(&namespaced_key(cache_name, key));
    }
}

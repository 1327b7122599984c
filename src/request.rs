//! Request and cache key primitives.

use std::sync::Arc;

/// An ordered sequence of opaque argument values received by the key factory
/// and the fetcher.
///
/// Pipeline stages never mutate the caller's request in place; each stage
/// receives the prior stage's output.
pub type StorageRequest = Vec<serde_json::Value>;

/// Address of a cache slot within a namespace.
///
/// Keys are only meaningful together with a cache name; namespace + key is
/// the true address in both cache tiers.
pub type Key = String;

/// A pure function deriving a [`Key`] from a [`StorageRequest`].
///
/// The factory always receives the whole (possibly plugin-transformed)
/// request as a single slice; there is no per-argument spread convention.
pub type KeyFactory = Arc<dyn Fn(&StorageRequest) -> Key + Send + Sync>;

/// Access modes for the durable cache, passed to the `cache_key_will_be_used`
/// hook so plugins can derive different keys for reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageAccess {
    Read,
    Write,
}

/// Build a key factory that joins every request argument with `:`.
///
/// Convenient default for resources whose arguments render unambiguously.
///
/// # Example
///
/// ```
/// use resource_kit::request::joined_key_factory;
/// use serde_json::json;
///
/// let factory = joined_key_factory();
/// assert_eq!(factory(&vec![json!("user"), json!(42)]), "\"user\":42");
/// ```
pub fn joined_key_factory() -> KeyFactory {
    Arc::new(|request: &StorageRequest| {
        request
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(":")
    })
}

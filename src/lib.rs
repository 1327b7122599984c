//! # resource-kit
//!
//! A resource-fetch orchestration engine for Rust.
//!
//! ## Features
//!
//! - **Fully Generic:** Orchestrate any `T: Clone + Send + Sync` value
//! - **Two-Tier Caching:** A durable strategy cache plus a transient resource cache
//! - **Pluggable Pipeline:** Hooks observe and transform every stage - request,
//!   response, cache key, cached value, and cache write
//! - **Five Strategies:** cache-only, cache-first, fetcher-first with timeout,
//!   stale-while-revalidate, and a cache/fetcher race
//! - **Storage Agnostic:** Both tiers run over any key/value store satisfying the
//!   minimal [`KeyValueStorage`] contract
//! - **Production Ready:** Built-in logging and error handling
//!
//! ## Quick Start
//!
//! ```ignore
//! use resource_kit::{
//!     FetchFn, Resource, StaleWhileRevalidate,
//!     request::joined_key_factory,
//! };
//! use std::sync::Arc;
//!
//! // 1. Supply a fetcher
//! let fetcher = Arc::new(FetchFn::new(|request| async move {
//!     Ok(load_user(&request).await?)
//! }));
//!
//! // 2. Bind it into a resource with a strategy
//! let users = Resource::new("users", joined_key_factory(), fetcher)
//!     .with_strategy(Arc::new(StaleWhileRevalidate::new(vec![])));
//!
//! // 3. Read - concurrent readers of one key share a single operation
//! let user = users.read(vec![serde_json::json!("user_1")]).await?;
//!
//! // 4. Revalidate or override on demand
//! users.trigger(vec![serde_json::json!("user_1")]);
//! users.mutate(updated_user, vec![serde_json::json!("user_1")]);
//! ```

#[macro_use]
extern crate log;

pub mod emitter;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod request;
pub mod resource;
pub mod resource_cache;
pub mod response;
pub mod storage;
pub mod strategies;
pub mod strategy_cache;

// Re-exports for convenience
pub use emitter::{Emitter, Listener, Subscription};
pub use error::{Error, FailureReason, FetchError, Result};
pub use fetcher::{DataFetcher, FetchFn, FetchResult};
pub use pipeline::{cache_data, fetch_data, match_data, HandlerParam};
pub use plugin::{HookContext, PluginList, PluginRef, ResourcePlugin};
pub use plugins::{ExpirationPlugin, SuccessOnlyPlugin};
pub use request::{Key, KeyFactory, StorageAccess, StorageRequest};
pub use resource::Resource;
pub use resource_cache::{Operation, ResourceCache, ResourceEntry};
pub use response::ResponseData;
pub use storage::{InMemoryStorage, KeyValueStorage};
pub use strategies::{
    CacheFetcherRace, CacheFirst, CacheOnly, FetcherFirst, ResourceStrategy,
    StaleWhileRevalidate,
};
pub use strategy_cache::StrategyCache;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

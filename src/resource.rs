//! Resource façade - binds key derivation, the chosen strategy, and both
//! cache tiers into a `read` / `trigger` / `mutate` surface.
//!
//! The façade owns the at-most-one-operation-per-key rule: a read that finds
//! an in-flight operation awaits that same shared handle instead of starting
//! a duplicate. Operations are driven by a spawned task, so they settle even
//! when no reader is awaiting them.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::emitter::{Emitter, Listener, Subscription};
use crate::error::Result;
use crate::fetcher::DataFetcher;
use crate::pipeline::HandlerParam;
use crate::request::{Key, KeyFactory, StorageRequest};
use crate::resource_cache::{Operation, ResourceCache, ResourceEntry};
use crate::response::ResponseData;
use crate::strategies::ResourceStrategy;
use crate::strategy_cache::StrategyCache;

/// A keyed remote resource.
///
/// Without a strategy, reads go straight to the fetcher with no durable-cache
/// participation; with one, every operation runs through the strategy's
/// reconciliation logic. Either way the outcome lands in the transient
/// resource cache and subscribers are notified on `trigger` and `mutate`.
pub struct Resource<T>
where
    T: Clone + Send + Sync + 'static,
{
    cache_name: String,
    key_factory: KeyFactory,
    fetcher: Arc<dyn DataFetcher<T>>,
    strategy: Option<Arc<dyn ResourceStrategy<T>>>,
    strategy_cache: StrategyCache<T>,
    resource_cache: ResourceCache<T>,
    emitter: Emitter,
}

impl<T> Resource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a resource with fresh in-memory cache tiers and no strategy.
    pub fn new(
        cache_name: &str,
        key_factory: KeyFactory,
        fetcher: Arc<dyn DataFetcher<T>>,
    ) -> Self {
        Resource {
            cache_name: cache_name.to_string(),
            key_factory,
            fetcher,
            strategy: None,
            strategy_cache: StrategyCache::in_memory(),
            resource_cache: ResourceCache::in_memory(),
            emitter: Emitter::new(),
        }
    }

    /// Route operations through the given strategy.
    pub fn with_strategy(mut self, strategy: Arc<dyn ResourceStrategy<T>>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Use the given durable cache tier (shared across resources, usually).
    pub fn with_strategy_cache(mut self, cache: StrategyCache<T>) -> Self {
        self.strategy_cache = cache;
        self
    }

    /// Use the given transient cache tier.
    pub fn with_resource_cache(mut self, cache: ResourceCache<T>) -> Self {
        self.resource_cache = cache;
        self
    }

    fn handler_param(&self, request: StorageRequest) -> HandlerParam<T> {
        HandlerParam {
            cache_name: self.cache_name.clone(),
            key_factory: Arc::clone(&self.key_factory),
            fetcher: Arc::clone(&self.fetcher),
            request,
            cache: self.strategy_cache.clone(),
        }
    }

    /// Start a new operation for the key and overwrite its entry.
    ///
    /// The pending entry is stored before the operation is first polled, so a
    /// concurrent reader always finds the shared handle rather than starting
    /// its own fetch. A spawned task drives the operation to completion.
    fn start_fetch(&self, key: &Key, request: StorageRequest) -> Operation<T> {
        debug!("» operation start for '{}:{}'", self.cache_name, key);

        let inner: BoxFuture<'static, ResponseData<T>> = match &self.strategy {
            Some(strategy) => {
                let strategy = Arc::clone(strategy);
                let param = self.handler_param(request);
                async move {
                    match strategy.handle(&param).await {
                        Ok(data) => data,
                        Err(err) => ResponseData::Failure(Arc::new(err)),
                    }
                }
                .boxed()
            }
            None => {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    match fetcher.fetch(&request).await {
                        Ok(value) => ResponseData::Success(value),
                        Err(err) => ResponseData::Failure(Arc::from(err)),
                    }
                }
                .boxed()
            }
        };

        let resource_cache = self.resource_cache.clone();
        let cache_name = self.cache_name.clone();
        let settle_key = key.clone();
        let operation: Operation<T> = async move {
            let data = inner.await;
            resource_cache.set(&cache_name, &settle_key, ResourceEntry::settled(data.clone()));
            data
        }
        .boxed()
        .shared();

        self.resource_cache
            .set(&self.cache_name, key, ResourceEntry::pending(operation.clone()));

        tokio::spawn(operation.clone().map(|_| ()));

        operation
    }

    /// Read the resource for the given request.
    ///
    /// Starts an operation if none exists for the key, awaits the in-flight
    /// one if unsettled, and otherwise returns the settled value - or the
    /// stored failure reason as [`crate::Error::Fetch`].
    pub async fn read(&self, request: StorageRequest) -> Result<T> {
        let key = (self.key_factory)(&request);

        let data = match self.resource_cache.get(&self.cache_name, &key) {
            Some(ResourceEntry {
                data: Some(data), ..
            }) => data,
            Some(ResourceEntry {
                instance: Some(instance),
                ..
            }) => instance.await,
            _ => self.start_fetch(&key, request).await,
        };

        data.into_result()
    }

    /// Unconditionally start a new operation for the key and notify
    /// subscribers.
    pub fn trigger(&self, request: StorageRequest) {
        let key = (self.key_factory)(&request);
        self.start_fetch(&key, request);
        self.emitter.publish(&key);
    }

    /// Directly install `Success(value)` for the key.
    ///
    /// With a strategy configured the value goes into the durable cache and a
    /// fresh operation runs so the strategy's own caching side effects apply;
    /// without one, the resource cache entry is settled in place. Subscribers
    /// are notified either way.
    pub fn mutate(&self, value: T, request: StorageRequest) {
        let key = (self.key_factory)(&request);

        if self.strategy.is_some() {
            self.strategy_cache
                .set(&self.cache_name, &key, ResponseData::Success(value));
            self.start_fetch(&key, request);
        } else {
            self.resource_cache.set(
                &self.cache_name,
                &key,
                ResourceEntry::settled(ResponseData::Success(value)),
            );
        }

        self.emitter.publish(&key);
    }

    /// Current operation state for the request's key, without blocking.
    pub fn entry(&self, request: &StorageRequest) -> Option<ResourceEntry<T>> {
        let key = (self.key_factory)(request);
        self.resource_cache.get(&self.cache_name, &key)
    }

    /// Register an invalidation listener.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        self.emitter.subscribe(listener)
    }

    /// Remove a previously registered invalidation listener.
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.emitter.unsubscribe(subscription)
    }
}

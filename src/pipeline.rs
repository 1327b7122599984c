//! Hook-chaining pipeline: fetch, cache read, and cache write operations.
//!
//! Every stage is a deterministic composition over the strategy's plugin
//! list, executed in list order. Transforming stages reduce the stage value
//! through each plugin; observing stages run for each plugin in order.

use std::sync::Arc;

use crate::error::Result;
use crate::fetcher::DataFetcher;
use crate::plugin::{HookContext, PluginRef};
use crate::request::{KeyFactory, StorageAccess, StorageRequest};
use crate::response::ResponseData;
use crate::strategy_cache::StrategyCache;

/// Everything a strategy operation needs: the namespace, the key factory,
/// the fetcher, the current request, and the durable cache handle.
///
/// Cheap to clone; strategies clone it into background write tasks.
pub struct HandlerParam<T> {
    pub cache_name: String,
    pub key_factory: KeyFactory,
    pub fetcher: Arc<dyn DataFetcher<T>>,
    pub request: StorageRequest,
    pub cache: StrategyCache<T>,
}

impl<T> Clone for HandlerParam<T> {
    fn clone(&self) -> Self {
        HandlerParam {
            cache_name: self.cache_name.clone(),
            key_factory: Arc::clone(&self.key_factory),
            fetcher: Arc::clone(&self.fetcher),
            request: self.request.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T> HandlerParam<T> {
    fn hook_context<'a>(&'a self, request: &'a StorageRequest) -> HookContext<'a> {
        HookContext {
            cache_name: &self.cache_name,
            key_factory: &self.key_factory,
            request,
        }
    }
}

/// Reduce the request through every plugin's `request_will_fetch`.
pub(crate) async fn run_request_will_fetch<T>(
    param: &HandlerParam<T>,
    plugins: &[PluginRef<T>],
) -> Result<StorageRequest>
where
    T: Clone + Send + Sync + 'static,
{
    let ctx = param.hook_context(&param.request);
    let mut acc = param.request.clone();
    for plugin in plugins {
        acc = plugin.request_will_fetch(&ctx, acc).await?;
    }
    Ok(acc)
}

/// Reduce the request through every plugin's `cache_key_will_be_used` under
/// the given access mode.
pub(crate) async fn run_cache_key_will_be_used<T>(
    param: &HandlerParam<T>,
    plugins: &[PluginRef<T>],
    access: StorageAccess,
) -> Result<StorageRequest>
where
    T: Clone + Send + Sync + 'static,
{
    let ctx = param.hook_context(&param.request);
    let mut acc = param.request.clone();
    for plugin in plugins {
        acc = plugin.cache_key_will_be_used(&ctx, acc, access).await?;
    }
    Ok(acc)
}

/// Run every plugin's `fetch_did_fail` with the same error, in order.
async fn run_fetch_did_fail<T>(
    param: &HandlerParam<T>,
    plugins: &[PluginRef<T>],
    new_request: &StorageRequest,
    error: &crate::error::Error,
) -> Result<()>
where
    T: Clone + Send + Sync + 'static,
{
    let ctx = param.hook_context(&param.request);
    for plugin in plugins {
        plugin
            .fetch_did_fail(&ctx, &param.request, new_request, error)
            .await?;
    }
    Ok(())
}

/// Fetch data through the plugin pipeline.
///
/// Runs `request_will_fetch`, invokes the fetcher with the transformed
/// request, converts any rejection into a `Failure` response (the fetch call
/// itself never raises past this point), then runs `fetch_did_succeed` over
/// the normalized result. If a hook raises in that region, `fetch_did_fail`
/// observes (original request, transformed request, error) and the error is
/// re-raised.
pub async fn fetch_data<T>(
    param: &HandlerParam<T>,
    plugins: &[PluginRef<T>],
) -> Result<ResponseData<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let new_request = run_request_will_fetch(param, plugins).await?;

    debug!("» fetch for cache '{}'", param.cache_name);

    let mut acc = match param.fetcher.fetch(&new_request).await {
        Ok(value) => ResponseData::Success(value),
        Err(reason) => {
            debug!("✗ fetcher rejected for cache '{}'", param.cache_name);
            ResponseData::Failure(Arc::from(reason))
        }
    };

    let ctx = param.hook_context(&new_request);
    for plugin in plugins {
        match plugin.fetch_did_succeed(&ctx, acc).await {
            Ok(next) => acc = next,
            Err(error) => {
                run_fetch_did_fail(param, plugins, &new_request, &error).await?;
                return Err(error);
            }
        }
    }

    Ok(acc)
}

/// Read data from the durable cache through the plugin pipeline.
///
/// Derives a read-mode request via `cache_key_will_be_used`, computes the
/// key from it, looks up the durable entry and filters it through
/// `cached_response_will_be_used`. "No value" and "filtered out" are
/// indistinguishable to callers.
pub async fn match_data<T>(
    param: &HandlerParam<T>,
    plugins: &[PluginRef<T>],
) -> Result<Option<ResponseData<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    let new_request = run_cache_key_will_be_used(param, plugins, StorageAccess::Read).await?;
    let key = (param.key_factory)(&new_request);

    let mut acc = param.cache.get(&param.cache_name, &key);
    debug!(
        "» cache read {}:{} -> {}",
        param.cache_name,
        key,
        if acc.is_some() { "HIT" } else { "MISS" }
    );

    let ctx = param.hook_context(&new_request);
    for plugin in plugins {
        acc = plugin.cached_response_will_be_used(&ctx, acc).await?;
    }

    Ok(acc)
}

/// Write data to the durable cache through the plugin pipeline.
///
/// Derives a write-mode request, runs the short-circuiting
/// `cache_will_update` gate (a final `Failure` is discarded, never
/// persisted), reads the prior value via [`match_data`] for the benefit of
/// `cache_did_update` observers, writes, then notifies. A gated write
/// mutates nothing and notifies nobody.
pub async fn cache_data<T>(
    param: &HandlerParam<T>,
    response: ResponseData<T>,
    plugins: &[PluginRef<T>],
) -> Result<()>
where
    T: Clone + Send + Sync + 'static,
{
    let new_request = run_cache_key_will_be_used(param, plugins, StorageAccess::Write).await?;
    let ctx = param.hook_context(&new_request);

    let mut acc = Some(response);
    for plugin in plugins {
        let Some(current) = acc.take() else { break };
        acc = plugin.cache_will_update(&ctx, current).await?;
    }

    // Unblocked failures are still never persisted.
    if matches!(acc, Some(ResponseData::Failure(_))) {
        acc = None;
    }

    let Some(new_response) = acc else {
        debug!("✗ cache write gated for '{}'", param.cache_name);
        return Ok(());
    };

    let key = (param.key_factory)(&new_request);

    let old_response = {
        let mut read_param = param.clone();
        read_param.request = new_request.clone();
        match_data(&read_param, plugins).await?
    };

    param.cache.set(&param.cache_name, &key, new_response.clone());

    for plugin in plugins {
        plugin
            .cache_did_update(&ctx, old_response.as_ref(), &new_response)
            .await?;
    }

    Ok(())
}

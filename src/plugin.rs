//! Plugin hook set for observing and transforming pipeline stages.
//!
//! A plugin is a named bundle of optional hook implementations. Every hook
//! has a pass-through default, so implementors override only the stages they
//! care about; the pipeline calls every plugin at every stage without any
//! runtime presence checks. Ordering of plugins within a strategy is
//! significant and caller-specified.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::request::{KeyFactory, StorageAccess, StorageRequest};
use crate::response::ResponseData;

/// Stage context handed to every hook.
///
/// `request` is the stage-appropriate request: the original one for fetch
/// stages, the transformed one for cache read/write stages.
pub struct HookContext<'a> {
    pub cache_name: &'a str,
    pub key_factory: &'a KeyFactory,
    pub request: &'a StorageRequest,
}

impl HookContext<'_> {
    /// Derive the cache key for the context's request.
    pub fn key(&self) -> String {
        (self.key_factory)(self.request)
    }
}

/// Lifecycle hooks observing and transforming every reconciliation stage.
///
/// Hook errors always propagate uncaught; the engine never swallows plugin
/// exceptions into `Failure` data.
#[async_trait]
pub trait ResourcePlugin<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Transform the request before the fetcher runs. Sequential reduce:
    /// each plugin's output feeds the next.
    async fn request_will_fetch(
        &self,
        ctx: &HookContext<'_>,
        request: StorageRequest,
    ) -> Result<StorageRequest> {
        let _ = ctx;
        Ok(request)
    }

    /// Transform the normalized fetch response. Sequential reduce.
    async fn fetch_did_succeed(
        &self,
        ctx: &HookContext<'_>,
        response: ResponseData<T>,
    ) -> Result<ResponseData<T>> {
        let _ = ctx;
        Ok(response)
    }

    /// Observe a fetch-stage hook failure. Side effect only; all plugins
    /// observe the same error.
    async fn fetch_did_fail(
        &self,
        ctx: &HookContext<'_>,
        old_request: &StorageRequest,
        new_request: &StorageRequest,
        error: &Error,
    ) -> Result<()> {
        let _ = (ctx, old_request, new_request, error);
        Ok(())
    }

    /// Transform the request used to derive the cache key, parameterized by
    /// access mode. Sequential reduce.
    async fn cache_key_will_be_used(
        &self,
        ctx: &HookContext<'_>,
        request: StorageRequest,
        access: StorageAccess,
    ) -> Result<StorageRequest> {
        let _ = (ctx, access);
        Ok(request)
    }

    /// Filter or synthesize the cached value on the read path. A plugin may
    /// turn a hit into a miss (e.g. expired) or a miss into a synthesized
    /// hit. Sequential reduce.
    async fn cached_response_will_be_used(
        &self,
        ctx: &HookContext<'_>,
        cached_response: Option<ResponseData<T>>,
    ) -> Result<Option<ResponseData<T>>> {
        let _ = ctx;
        Ok(cached_response)
    }

    /// Gate the cache write. The reduce short-circuits on the first plugin
    /// returning `None`; a final `Failure` result is discarded by the engine
    /// and never persisted.
    async fn cache_will_update(
        &self,
        ctx: &HookContext<'_>,
        response: ResponseData<T>,
    ) -> Result<Option<ResponseData<T>>> {
        let _ = ctx;
        Ok(Some(response))
    }

    /// Observe a completed cache write as an edit: prior value and the value
    /// just written. Side effect only.
    async fn cache_did_update(
        &self,
        ctx: &HookContext<'_>,
        old_response: Option<&ResponseData<T>>,
        new_response: &ResponseData<T>,
    ) -> Result<()> {
        let _ = (ctx, old_response, new_response);
        Ok(())
    }
}

/// Shared handle to a plugin in a strategy's ordered list.
pub type PluginRef<T> = Arc<dyn ResourcePlugin<T>>;

/// Ordered plugin list as configured on a strategy.
pub type PluginList<T> = Vec<PluginRef<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::joined_key_factory;
    use serde_json::json;

    struct NoOverrides;

    #[async_trait]
    impl ResourcePlugin<i32> for NoOverrides {}

    #[tokio::test]
    async fn test_default_hooks_pass_through() {
        let plugin = NoOverrides;
        let key_factory = joined_key_factory();
        let request = vec![json!("a")];
        let ctx = HookContext {
            cache_name: "test",
            key_factory: &key_factory,
            request: &request,
        };

        let out = plugin
            .request_will_fetch(&ctx, request.clone())
            .await
            .unwrap();
        assert_eq!(out, request);

        let cached = plugin
            .cached_response_will_be_used(&ctx, Some(ResponseData::Success(1)))
            .await
            .unwrap();
        assert!(matches!(cached, Some(ResponseData::Success(1))));

        let gated = plugin
            .cache_will_update(&ctx, ResponseData::Success(2))
            .await
            .unwrap();
        assert!(matches!(gated, Some(ResponseData::Success(2))));
    }

    #[tokio::test]
    async fn test_hook_context_key() {
        let key_factory = joined_key_factory();
        let request = vec![json!("user"), json!(7)];
        let ctx = HookContext {
            cache_name: "test",
            key_factory: &key_factory,
            request: &request,
        };
        assert_eq!(ctx.key(), "\"user\":7");
    }
}

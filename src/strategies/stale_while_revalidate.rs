//! Stale-while-revalidate strategy.

use async_trait::async_trait;

use super::{ensure_plugins, ResourceStrategy};
use crate::error::{Error, Result};
use crate::pipeline::{cache_data, fetch_data, match_data, HandlerParam};
use crate::plugin::{PluginList, PluginRef};
use crate::response::ResponseData;

/// Serve the cached value immediately while revalidating in the background.
///
/// The fetch starts first; whatever it eventually resolves to is written to
/// the durable cache off the response path. If the cache read hits, the
/// stale value is returned without waiting on the fetch; on a miss the
/// backgrounded fetch result is awaited instead.
pub struct StaleWhileRevalidate<T>
where
    T: Clone + Send + Sync + 'static,
{
    plugins: PluginList<T>,
}

impl<T> StaleWhileRevalidate<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(plugins: PluginList<T>) -> Self {
        StaleWhileRevalidate {
            plugins: ensure_plugins(plugins),
        }
    }
}

/// Fetch and kick off the durable write, returning the fetched response.
async fn revalidate<T>(
    param: HandlerParam<T>,
    plugins: Vec<PluginRef<T>>,
) -> Result<ResponseData<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let response = fetch_data(&param, &plugins).await?;

    let to_cache = response.clone();
    tokio::spawn(async move {
        if let Err(err) = cache_data(&param, to_cache, &plugins).await {
            debug!("✗ revalidation cache write failed: {}", err);
        }
    });

    Ok(response)
}

#[async_trait]
impl<T> ResourceStrategy<T> for StaleWhileRevalidate<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn handle(&self, param: &HandlerParam<T>) -> Result<ResponseData<T>> {
        debug!("» StaleWhileRevalidate for '{}'", param.cache_name);

        let prefetch = tokio::spawn(revalidate(param.clone(), self.plugins.clone()));

        if let Some(response) = match_data(param, &self.plugins).await? {
            debug!("✓ serving stale value (StaleWhileRevalidate)");
            return Ok(response);
        }

        debug!("✗ cache miss (StaleWhileRevalidate), awaiting fetch");
        match prefetch.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(Error::Other(format!(
                "revalidation task failed: {}",
                join_err
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{
        param, permissive_plugins, seed, stored, CountingFetcher,
    };
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stale_hit_served_then_store_revalidated() {
        let fetcher =
            Arc::new(CountingFetcher::resolving("newer").with_delay(Duration::from_millis(30)));
        let calls = Arc::clone(&fetcher.calls);
        let param = param(fetcher);
        seed(&param, "stale");

        let strategy = StaleWhileRevalidate::new(permissive_plugins());
        let response = strategy.handle(&param).await.unwrap();

        // Stale value first, without waiting for the fetch.
        assert_eq!(response.value().unwrap(), "stale");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The background revalidation eventually lands in the durable cache.
        for _ in 0..50 {
            if stored(&param).as_deref() == Some("newer") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("durable cache never revalidated");
    }

    #[tokio::test]
    async fn test_miss_awaits_background_fetch() {
        let fetcher = Arc::new(CountingFetcher::resolving("fresh"));
        let param = param(fetcher);

        let strategy = StaleWhileRevalidate::new(permissive_plugins());
        let response = strategy.handle(&param).await.unwrap();

        assert_eq!(response.value().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_default_plugins_gate_revalidation_write() {
        let fetcher = Arc::new(CountingFetcher::resolving("fresh"));
        let param = param(fetcher);
        seed(&param, "stale");

        let strategy = StaleWhileRevalidate::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();
        assert_eq!(response.value().unwrap(), "stale");

        // Under the default success-only filter the revalidated success is
        // gated; the durable cache keeps the stale value.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stored(&param).as_deref(), Some("stale"));
    }

    #[tokio::test]
    async fn test_miss_with_rejecting_fetcher_yields_failure_data() {
        let fetcher = Arc::new(CountingFetcher::rejecting("down"));
        let param = param(fetcher);

        let strategy = StaleWhileRevalidate::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();

        assert!(response.is_failure());
    }
}

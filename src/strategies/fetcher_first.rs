//! Fetcher-first strategy with optional cache-fallback timeout.

use std::time::Duration;

use async_trait::async_trait;

use super::{ensure_plugins, ResourceStrategy};
use crate::error::{Error, Result};
use crate::pipeline::{cache_data, fetch_data, match_data, HandlerParam};
use crate::plugin::PluginList;
use crate::response::ResponseData;

/// Prefer fresh data, optionally falling back to the durable cache after a
/// timeout.
///
/// Without a timeout this simply awaits the fetch branch. With one, the
/// fetch branch runs on its own task and races a deferred cache read that
/// only starts once the timeout elapses; whichever settles first wins. The
/// timeout only changes which branch is awaited - a losing fetch keeps
/// running and still performs its background cache write.
///
/// Successful fetch responses are written to the durable cache in the
/// background; a fetch-stage hook error falls back to a cache read.
pub struct FetcherFirst<T>
where
    T: Clone + Send + Sync + 'static,
{
    plugins: PluginList<T>,
    timeout: Option<Duration>,
}

impl<T> FetcherFirst<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(plugins: PluginList<T>) -> Self {
        FetcherFirst {
            plugins: ensure_plugins(plugins),
            timeout: None,
        }
    }

    /// Race the fetch against a cache read deferred by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fetch, kick off the durable write on success, fall back to a cache read
/// on a fetch-stage hook error.
async fn fetch_branch<T>(
    param: HandlerParam<T>,
    plugins: PluginList<T>,
) -> Result<Option<ResponseData<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    match fetch_data(&param, &plugins).await {
        Ok(response) => {
            let to_cache = response.clone();
            tokio::spawn(async move {
                if let Err(err) = cache_data(&param, to_cache, &plugins).await {
                    debug!("✗ background cache write failed: {}", err);
                }
            });
            Ok(Some(response))
        }
        Err(err) => {
            debug!("✗ fetch stage failed ({}), falling back to cache", err);
            match_data(&param, &plugins).await
        }
    }
}

#[async_trait]
impl<T> ResourceStrategy<T> for FetcherFirst<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn handle(&self, param: &HandlerParam<T>) -> Result<ResponseData<T>> {
        debug!(
            "» FetcherFirst for '{}' (timeout: {:?})",
            param.cache_name, self.timeout
        );

        let response = match self.timeout {
            Some(timeout) => {
                // The fetch runs on its own task: losing the race below must
                // not abort it or its durable write.
                let fetch_task =
                    tokio::spawn(fetch_branch(param.clone(), self.plugins.clone()));

                let cache_branch = async {
                    tokio::time::sleep(timeout).await;
                    debug!("✗ fetch timed out after {:?}, reading cache", timeout);
                    match_data(param, &self.plugins).await
                };

                tokio::select! {
                    outcome = fetch_task => outcome
                        .map_err(|err| Error::Other(format!("fetch task failed: {}", err)))??,
                    outcome = cache_branch => outcome?,
                }
            }
            None => fetch_branch(param.clone(), self.plugins.clone()).await?,
        };

        response.ok_or_else(|| Error::NoResponse {
            cache_name: param.cache_name.clone(),
            request: param.request.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{HookContext, PluginRef, ResourcePlugin};
    use crate::strategies::test_support::{
        param, permissive_plugins, seed, stored, CountingFetcher, PendingFetcher,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_wins_and_persists_in_background() {
        let fetcher = Arc::new(CountingFetcher::resolving("fresh"));
        let param = param(fetcher);
        seed(&param, "stale");

        let strategy = FetcherFirst::new(permissive_plugins()).with_timeout(Duration::from_secs(5));
        let response = strategy.handle(&param).await.unwrap();
        assert_eq!(response.value().unwrap(), "fresh");

        // The durable write happens off the response path; wait for it.
        for _ in 0..50 {
            if stored(&param).as_deref() == Some("fresh") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("durable cache never updated with the fetched value");
    }

    #[tokio::test(start_paused = true)]
    async fn test_losing_fetch_still_persists_after_timeout() {
        let fetcher =
            Arc::new(CountingFetcher::resolving("fresh").with_delay(Duration::from_millis(60)));
        let param = param(fetcher);
        seed(&param, "stale");

        let strategy =
            FetcherFirst::new(permissive_plugins()).with_timeout(Duration::from_millis(20));
        let response = strategy.handle(&param).await.unwrap();
        assert_eq!(response.value().unwrap(), "stale");

        // The fetch keeps running on its own task after losing the race and
        // its result still reaches the durable cache.
        for _ in 0..50 {
            if stored(&param).as_deref() == Some("fresh") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("losing fetch branch never persisted its result");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_cache() {
        let param = param(Arc::new(PendingFetcher));
        seed(&param, "cached");

        let strategy = FetcherFirst::new(vec![]).with_timeout(Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        let response = strategy.handle(&param).await.unwrap();

        assert_eq!(response.value().unwrap(), "cached");
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_empty_cache_raises_no_response() {
        let param = param(Arc::new(PendingFetcher));

        let strategy = FetcherFirst::new(vec![]).with_timeout(Duration::from_millis(20));
        let err = strategy.handle(&param).await.unwrap_err();

        assert!(matches!(err, Error::NoResponse { .. }));
    }

    #[tokio::test]
    async fn test_hook_error_falls_back_to_cache() {
        struct BrokenSucceedHook;

        #[async_trait]
        impl ResourcePlugin<String> for BrokenSucceedHook {
            async fn fetch_did_succeed(
                &self,
                _ctx: &HookContext<'_>,
                _response: ResponseData<String>,
            ) -> Result<ResponseData<String>> {
                Err(Error::Plugin("broken".to_string()))
            }
        }

        let fetcher = Arc::new(CountingFetcher::resolving("fresh"));
        let param = param(fetcher);

        let key = (param.key_factory)(&param.request);
        param.cache.set(
            &param.cache_name,
            &key,
            ResponseData::Success("cached".to_string()),
        );

        let plugins: Vec<PluginRef<String>> = vec![Arc::new(BrokenSucceedHook)];
        let strategy = FetcherFirst::new(plugins);
        let response = strategy.handle(&param).await.unwrap();

        assert_eq!(response.value().unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_no_timeout_returns_failure_data_on_rejection() {
        let fetcher = Arc::new(CountingFetcher::rejecting("down"));
        let param = param(fetcher);

        let strategy = FetcherFirst::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();

        assert!(response.is_failure());
    }
}

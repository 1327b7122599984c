//! Cache/fetcher race strategy.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

use super::{ensure_plugins, ResourceStrategy};
use crate::error::{Error, Result};
use crate::pipeline::{fetch_data, match_data, HandlerParam};
use crate::plugin::PluginList;
use crate::response::ResponseData;

/// Run the fetch and the durable-cache read concurrently; the first branch
/// to produce a response wins.
///
/// An empty cache read does not win the race, it just drops out; the other
/// branch is still awaited. The fetch runs on its own task, so a losing
/// fetch settles anyway and its pipeline hooks observe the outcome; only
/// its response goes unused. Nothing is written back to the durable cache.
/// When both branches come up empty-handed the per-branch errors are
/// aggregated into [`Error::AllFailed`], fetch branch first.
pub struct CacheFetcherRace<T>
where
    T: Clone + Send + Sync + 'static,
{
    plugins: PluginList<T>,
}

impl<T> CacheFetcherRace<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(plugins: PluginList<T>) -> Self {
        CacheFetcherRace {
            plugins: ensure_plugins(plugins),
        }
    }
}

#[async_trait]
impl<T> ResourceStrategy<T> for CacheFetcherRace<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn handle(&self, param: &HandlerParam<T>) -> Result<ResponseData<T>> {
        debug!("» CacheFetcherRace for '{}'", param.cache_name);

        type Branch<'a, T> = BoxFuture<'a, (usize, Result<Option<ResponseData<T>>>)>;

        // Spawned so that losing the race does not cancel the fetch or the
        // hooks observing it.
        let fetch_task = tokio::spawn({
            let param = param.clone();
            let plugins = self.plugins.clone();
            async move { fetch_data(&param, &plugins).await.map(Some) }
        });

        let fetch_branch: Branch<'_, T> = async move {
            let outcome = match fetch_task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(Error::Other(format!("fetch task failed: {}", err))),
            };
            (0, outcome)
        }
        .boxed();
        let cache_branch: Branch<'_, T> = async {
            let outcome = match_data(param, &self.plugins).await;
            (1, outcome)
        }
        .boxed();

        let mut branches: FuturesUnordered<Branch<'_, T>> =
            vec![fetch_branch, cache_branch].into_iter().collect();

        let mut errors: [Option<Error>; 2] = [None, None];
        while let Some((index, outcome)) = branches.next().await {
            match outcome {
                Ok(Some(response)) => {
                    debug!(
                        "✓ branch {} won the race ({})",
                        index,
                        if index == 0 { "fetch" } else { "cache" }
                    );
                    return Ok(response);
                }
                Ok(None) => {
                    errors[index] = Some(Error::NoResponse {
                        cache_name: param.cache_name.clone(),
                        request: param.request.clone(),
                    });
                }
                Err(err) => {
                    debug!("✗ branch {} failed: {}", index, err);
                    errors[index] = Some(err);
                }
            }
        }

        Err(Error::AllFailed(
            errors.into_iter().flatten().collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{HookContext, PluginRef, ResourcePlugin};
    use crate::request::StorageRequest;
    use crate::strategies::test_support::{param, seed, stored, CountingFetcher};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cache_beats_slow_fetch() {
        let fetcher =
            Arc::new(CountingFetcher::resolving("fresh").with_delay(Duration::from_millis(50)));
        let param = param(fetcher);
        seed(&param, "cached");

        let strategy = CacheFetcherRace::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();

        assert_eq!(response.value().unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_fetch_wins_on_empty_cache_without_persisting() {
        let fetcher = Arc::new(CountingFetcher::resolving("fresh"));
        let param = param(fetcher);

        let strategy = CacheFetcherRace::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();

        assert_eq!(response.value().unwrap(), "fresh");
        assert_eq!(stored(&param), None);
    }

    #[tokio::test]
    async fn test_empty_cache_read_does_not_win() {
        // The cache branch resolves empty long before the delayed fetch; the
        // race must keep waiting for the fetch instead of treating the empty
        // read as a result.
        let fetcher =
            Arc::new(CountingFetcher::resolving("fresh").with_delay(Duration::from_millis(30)));
        let param = param(fetcher);

        let strategy = CacheFetcherRace::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();

        assert_eq!(response.value().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_losing_fetch_still_runs_its_hooks() {
        struct CountSucceed(Arc<AtomicUsize>);

        #[async_trait]
        impl ResourcePlugin<String> for CountSucceed {
            async fn fetch_did_succeed(
                &self,
                _ctx: &HookContext<'_>,
                response: ResponseData<String>,
            ) -> Result<ResponseData<String>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(response)
            }
        }

        let fetcher =
            Arc::new(CountingFetcher::resolving("fresh").with_delay(Duration::from_millis(30)));
        let param = param(fetcher);
        seed(&param, "cached");

        let succeeded = Arc::new(AtomicUsize::new(0));
        let plugins: Vec<PluginRef<String>> =
            vec![Arc::new(CountSucceed(Arc::clone(&succeeded)))];
        let strategy = CacheFetcherRace::new(plugins);
        let response = strategy.handle(&param).await.unwrap();
        assert_eq!(response.value().unwrap(), "cached");

        // The fetch branch lost, but it settles on its own task and its
        // hooks still observe the outcome.
        for _ in 0..50 {
            if succeeded.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("losing fetch branch never ran its hooks");
    }

    #[tokio::test]
    async fn test_all_branches_failing_aggregates_in_branch_order() {
        struct BrokenRead;

        #[async_trait]
        impl ResourcePlugin<String> for BrokenRead {
            async fn request_will_fetch(
                &self,
                _ctx: &HookContext<'_>,
                _request: StorageRequest,
            ) -> Result<StorageRequest> {
                Err(Error::Plugin("fetch hook down".to_string()))
            }

            async fn cached_response_will_be_used(
                &self,
                _ctx: &HookContext<'_>,
                _cached_response: Option<ResponseData<String>>,
            ) -> Result<Option<ResponseData<String>>> {
                Err(Error::Plugin("read hook down".to_string()))
            }
        }

        let fetcher = Arc::new(CountingFetcher::resolving("fresh"));
        let param = param(fetcher);

        let plugins: Vec<PluginRef<String>> = vec![Arc::new(BrokenRead)];
        let strategy = CacheFetcherRace::new(plugins);
        let err = strategy.handle(&param).await.unwrap_err();

        match err {
            Error::AllFailed(causes) => {
                assert_eq!(causes.len(), 2);
                // Fetch branch error first, cache branch error second,
                // regardless of settlement order.
                assert!(matches!(&causes[0], Error::Plugin(msg) if msg == "fetch hook down"));
                assert!(matches!(&causes[1], Error::Plugin(msg) if msg == "read hook down"));
            }
            other => panic!("expected AllFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovered_rejection_wins_over_empty_cache() {
        // The fetcher rejection is recovered into failure data, which still
        // counts as a response and wins over the empty cache branch.
        let fetcher = Arc::new(CountingFetcher::rejecting("down"));
        let param = param(fetcher);

        let strategy = CacheFetcherRace::new(vec![]);
        let response = strategy.handle(&param).await.unwrap();

        assert!(response.is_failure());
    }
}

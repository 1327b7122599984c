//! Reconciliation strategies.
//!
//! A strategy decides how a durable-cache read and a fresh fetch are
//! reconciled for one request. Strategies are stateless aside from their
//! plugin list and static config; one instance may service many concurrent
//! keys.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::HandlerParam;
use crate::plugin::PluginList;
use crate::plugins::SuccessOnlyPlugin;
use crate::response::ResponseData;

pub mod cache_fetcher_race;
pub mod cache_first;
pub mod cache_only;
pub mod fetcher_first;
pub mod stale_while_revalidate;

pub use cache_fetcher_race::CacheFetcherRace;
pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use fetcher_first::FetcherFirst;
pub use stale_while_revalidate::StaleWhileRevalidate;

/// Resource-to-cache reconciliation logic.
///
/// Consumes the namespace, key factory, fetcher and current request bundled
/// in [`HandlerParam`] and settles to a response, or raises when nothing is
/// available.
#[async_trait]
pub trait ResourceStrategy<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    async fn handle(&self, param: &HandlerParam<T>) -> Result<ResponseData<T>>;
}

/// Substitute the default success-only filter for an empty plugin list.
pub(crate) fn ensure_plugins<T>(plugins: PluginList<T>) -> PluginList<T>
where
    T: Clone + Send + Sync + 'static,
{
    if plugins.is_empty() {
        vec![Arc::new(SuccessOnlyPlugin::new())]
    } else {
        plugins
    }
}

//! Cache-first strategy.

use async_trait::async_trait;

use super::{ensure_plugins, ResourceStrategy};
use crate::error::Result;
use crate::pipeline::{fetch_data, match_data, HandlerParam};
use crate::plugin::PluginList;
use crate::response::ResponseData;

/// Serve from the durable cache, falling back to the fetcher on a miss.
///
/// Reads the durable cache but never populates it from the fetched result.
pub struct CacheFirst<T>
where
    T: Clone + Send + Sync + 'static,
{
    plugins: PluginList<T>,
}

impl<T> CacheFirst<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(plugins: PluginList<T>) -> Self {
        CacheFirst {
            plugins: ensure_plugins(plugins),
        }
    }
}

#[async_trait]
impl<T> ResourceStrategy<T> for CacheFirst<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn handle(&self, param: &HandlerParam<T>) -> Result<ResponseData<T>> {
        debug!("» CacheFirst for '{}'", param.cache_name);

        if let Some(response) = match_data(param, &self.plugins).await? {
            debug!("✓ cache hit (CacheFirst)");
            return Ok(response);
        }

        debug!("✗ cache miss (CacheFirst), fetching");
        fetch_data(param, &self.plugins).await
    }
}

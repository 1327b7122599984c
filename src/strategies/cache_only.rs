//! Cache-only strategy.

use async_trait::async_trait;

use super::{ensure_plugins, ResourceStrategy};
use crate::error::{Error, Result};
use crate::pipeline::{match_data, HandlerParam};
use crate::plugin::PluginList;
use crate::response::ResponseData;

/// Serve from the durable cache or fail; never invokes the fetcher.
pub struct CacheOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    plugins: PluginList<T>,
}

impl<T> CacheOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(plugins: PluginList<T>) -> Self {
        CacheOnly {
            plugins: ensure_plugins(plugins),
        }
    }
}

#[async_trait]
impl<T> ResourceStrategy<T> for CacheOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn handle(&self, param: &HandlerParam<T>) -> Result<ResponseData<T>> {
        debug!("» CacheOnly for '{}'", param.cache_name);

        match match_data(param, &self.plugins).await? {
            Some(response) => Ok(response),
            None => Err(Error::NoResponse {
                cache_name: param.cache_name.clone(),
                request: param.request.clone(),
            }),
        }
    }
}

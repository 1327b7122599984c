//! Success-only cache-write filter.

use async_trait::async_trait;

use crate::error::Result;
use crate::plugin::{HookContext, ResourcePlugin};
use crate::response::ResponseData;

/// The default cache-write filter, installed whenever a strategy receives an
/// empty plugin list.
///
/// On `cache_will_update` it forwards `Failure` responses unchanged and
/// blocks everything else. Later plugins in the chain still observe the
/// forwarded failure; the engine's own failure-discard rule then removes it
/// before the store is touched. The forward and the discard are separate
/// steps and must stay that way.
#[derive(Clone, Copy, Debug, Default)]
pub struct SuccessOnlyPlugin;

impl SuccessOnlyPlugin {
    pub fn new() -> Self {
        SuccessOnlyPlugin
    }
}

#[async_trait]
impl<T> ResourcePlugin<T> for SuccessOnlyPlugin
where
    T: Clone + Send + Sync + 'static,
{
    async fn cache_will_update(
        &self,
        _ctx: &HookContext<'_>,
        response: ResponseData<T>,
    ) -> Result<Option<ResponseData<T>>> {
        if response.is_failure() {
            return Ok(Some(response));
        }
        Ok(None)
    }
}

//! Time-based expiration plugin.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::Result;
use crate::plugin::{HookContext, ResourcePlugin};
use crate::response::ResponseData;
use crate::storage::{namespaced_key, InMemoryStorage, KeyValueStorage};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Refuses cached responses older than a configured max age.
///
/// Maintains its own namespace×key→timestamp side-table, independent of the
/// durable cache's storage: expiration is evaluated at read time and evicts
/// access, not storage. On `cache_did_update` the write time is recorded; on
/// `cached_response_will_be_used` a response without a fresh-enough
/// timestamp is filtered into a miss. Without a configured max age every
/// response passes through unchanged.
pub struct ExpirationPlugin {
    max_age: Option<Duration>,
    timestamps: Arc<dyn KeyValueStorage<u64>>,
}

impl ExpirationPlugin {
    /// Expiration with the given max age and a fresh in-memory side-table.
    pub fn new(max_age: Option<Duration>) -> Self {
        ExpirationPlugin {
            max_age,
            timestamps: Arc::new(InMemoryStorage::new()),
        }
    }

    /// Use a caller-supplied side-table medium instead of in-memory.
    pub fn with_timestamps(mut self, timestamps: Arc<dyn KeyValueStorage<u64>>) -> Self {
        self.timestamps = timestamps;
        self
    }

    fn is_fresh(&self, cache_name: &str, key: &str, max_age: Duration) -> bool {
        let address = namespaced_key(cache_name, key);
        match self.timestamps.get(&address) {
            Some(written_at) => {
                let cutoff = now_millis().saturating_sub(max_age.as_millis() as u64);
                written_at >= cutoff
            }
            None => false,
        }
    }
}

#[async_trait]
impl<T> ResourcePlugin<T> for ExpirationPlugin
where
    T: Clone + Send + Sync + 'static,
{
    async fn cached_response_will_be_used(
        &self,
        ctx: &HookContext<'_>,
        cached_response: Option<ResponseData<T>>,
    ) -> Result<Option<ResponseData<T>>> {
        let Some(response) = cached_response else {
            return Ok(None);
        };

        let Some(max_age) = self.max_age else {
            return Ok(Some(response));
        };

        let key = ctx.key();
        if self.is_fresh(ctx.cache_name, &key, max_age) {
            return Ok(Some(response));
        }

        debug!("✗ expired entry for {}:{}", ctx.cache_name, key);
        Ok(None)
    }

    async fn cache_did_update(
        &self,
        ctx: &HookContext<'_>,
        _old_response: Option<&ResponseData<T>>,
        _new_response: &ResponseData<T>,
    ) -> Result<()> {
        let key = ctx.key();
        self.timestamps
            .set(&namespaced_key(ctx.cache_name, &key), now_millis());
        Ok(())
    }
}

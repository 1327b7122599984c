//! Fetcher trait for supplying fresh data.
//!
//! The `DataFetcher` trait decouples the engine from how data is actually
//! retrieved: HTTP clients, gRPC stubs, database queries, or plain closures
//! in tests all satisfy the same seam.

use std::future::Future;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::request::StorageRequest;

/// Outcome of a single fetch attempt, before pipeline normalization.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Trait for the caller-supplied remote-fetching operation.
///
/// Receives the (possibly plugin-transformed) request and eventually resolves
/// to a value or rejects. Rejections are recovered into `Failure` response
/// data by the pipeline; they never unwind past `fetch_data`.
#[async_trait]
pub trait DataFetcher<T>: Send + Sync {
    async fn fetch(&self, request: &StorageRequest) -> FetchResult<T>;
}

/// Adapter turning an async closure into a [`DataFetcher`].
///
/// # Example
///
/// ```
/// use resource_kit::fetcher::{DataFetcher, FetchFn};
/// use resource_kit::request::StorageRequest;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = FetchFn::new(|request: StorageRequest| async move {
///     Ok::<_, resource_kit::error::FetchError>(format!("fetched {}", request.len()))
/// });
/// let value = fetcher.fetch(&vec![json!(1)]).await.unwrap();
/// assert_eq!(value, "fetched 1");
/// # }
/// ```
pub struct FetchFn<F>(F);

impl<F> FetchFn<F> {
    pub fn new(f: F) -> Self {
        FetchFn(f)
    }
}

#[async_trait]
impl<T, F, Fut> DataFetcher<T> for FetchFn<F>
where
    T: Send + 'static,
    F: Fn(StorageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult<T>> + Send,
{
    async fn fetch(&self, request: &StorageRequest) -> FetchResult<T> {
        (self.0)(request.clone()).await
    }
}

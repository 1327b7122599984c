//! Error types for the resource engine.

use std::fmt;
use std::sync::Arc;

use crate::request::StorageRequest;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A settled failure reason, as produced by a fetcher or a strategy.
///
/// Stored inside [`crate::ResponseData::Failure`] entries, so it must stay
/// cheaply cloneable across cache tiers and shared in-flight operations.
pub type FailureReason = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error type a fetcher rejects with.
///
/// Converted into a [`FailureReason`] at the pipeline boundary; fetcher
/// rejections never propagate as raised errors past `fetch_data`.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for the resource engine.
///
/// All engine operations return `Result<T>` where `Result` is defined as
/// `std::result::Result<T, Error>`.
#[derive(Debug, Clone)]
pub enum Error {
    /// A strategy produced nothing: neither the cache nor the fetch branch
    /// yielded a response for the request.
    ///
    /// Carries the cache namespace and the request that was being served so
    /// callers can tell which resource came up empty.
    NoResponse {
        /// Namespace of the cache the strategy was addressing.
        cache_name: String,
        /// The request the strategy was serving.
        request: StorageRequest,
    },

    /// Every branch of a racing strategy failed.
    ///
    /// Carries one error per branch, in branch start order. A branch that
    /// resolved empty is recorded as [`Error::NoResponse`].
    AllFailed(Vec<Error>),

    /// A settled failure stored for the key.
    ///
    /// Raised by `Resource::read` when the resource cache entry holds a
    /// `Failure` response. The reason is the fetcher's original rejection.
    Fetch(FailureReason),

    /// A plugin hook failed.
    ///
    /// Plugin errors always propagate uncaught; the engine never swallows
    /// them into `Failure` data.
    Plugin(String),

    /// Generic error with custom message.
    ///
    /// Used for errors that don't fit into other variants.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoResponse {
                cache_name,
                request,
            } => {
                write!(
                    f,
                    "No response for cache '{}' (request: {})",
                    cache_name,
                    serde_json::Value::Array(request.clone())
                )
            }
            Error::AllFailed(errors) => {
                write!(f, "All branches failed ({} errors): ", errors.len())?;
                for (index, error) in errors.iter().enumerate() {
                    if index > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", error)?;
                }
                Ok(())
            }
            Error::Fetch(reason) => write!(f, "Fetch failure: {}", reason),
            Error::Plugin(msg) => write!(f, "Plugin error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

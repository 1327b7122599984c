//! Settled fetch outcomes.

use crate::error::{Error, FailureReason, Result};

/// The settled outcome of a fetch: a success value or a failure reason.
///
/// Immutable once constructed. Failures are data, not raised errors, so
/// readers can render or handle them without unwinding; the engine only
/// re-raises them at the façade's `read` surface.
#[derive(Clone, Debug)]
pub enum ResponseData<T> {
    Success(T),
    Failure(FailureReason),
}

impl<T> ResponseData<T> {
    /// Whether this response carries a success value.
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseData::Success(_))
    }

    /// Whether this response carries a failure reason.
    pub fn is_failure(&self) -> bool {
        matches!(self, ResponseData::Failure(_))
    }

    /// Convert into the engine result contract: success value or
    /// `Error::Fetch` carrying the stored failure reason.
    pub fn into_result(self) -> Result<T> {
        match self {
            ResponseData::Success(value) => Ok(value),
            ResponseData::Failure(reason) => Err(Error::Fetch(reason)),
        }
    }

    /// Borrow the success value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            ResponseData::Success(value) => Some(value),
            ResponseData::Failure(_) => None,
        }
    }
}

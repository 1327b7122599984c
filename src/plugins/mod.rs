//! Built-in plugins.

pub mod expiration;
pub mod success_only;

pub use expiration::ExpirationPlugin;
pub use success_only::SuccessOnlyPlugin;

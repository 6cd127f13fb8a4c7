//! Token acquisition and refresh
//!
//! The `TokenManager` caches a bearer token per connection and refreshes it
//! proactively when it comes within the configured safety margin of expiry.
//! Concurrent callers during an expired window observe exactly one refresh.

mod manager;
mod types;

pub use manager::TokenManager;
pub use types::AccessToken;

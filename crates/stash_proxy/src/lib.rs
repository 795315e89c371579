//! Outbound side of the proxy.
//!
//! - [`CacheAsideFetcher`]: answers from the store or fetches from the origin
//!   and stores the body
//! - [`ControlClient`]: finds the running server through the port registry
//!   and calls its `/clearCache` endpoint

mod control;
mod error;
mod fetcher;

pub use control::{CLEAR_CACHE_PATH, ControlClient};
pub use error::ProxyError;
pub use fetcher::{CacheAsideFetcher, CacheStatus, Resolved, cache_key, join_origin};

/// User-Agent sent on every outbound request.
pub const USER_AGENT: &str = concat!("stash/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client() -> Result<reqwest::Client, ProxyError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProxyError::ClientSetup)
}

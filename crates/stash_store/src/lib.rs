//! Durable state shared by the proxy server and the control client.
//!
//! A [`ConfigStore`] holds three things:
//! - the response cache (request path + query → body)
//! - the configured origin URL
//! - the port of the server that is currently listening (nullable)
//!
//! The port slot is how a short-lived `--clear-cache` process finds the
//! long-lived server: both open the same SQLite file, the server writes its
//! port on start and nulls it on stop.

mod entry;
mod error;
mod memory;
mod schema;
mod sqlite;

pub use entry::CacheEntry;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage contract used by every component of the proxy.
///
/// Implementations must keep at most one entry per path, keep the first value
/// stored for a path until the next full clear, and apply [`reset`] and
/// [`release`] atomically.
///
/// [`reset`]: ConfigStore::reset
/// [`release`]: ConfigStore::release
pub trait ConfigStore: Send + Sync {
    /// Store `data` under `path` unless the path is already cached.
    ///
    /// Returns `true` when the entry was inserted, `false` when an earlier
    /// entry won.
    fn put(&self, path: &str, data: &[u8]) -> StoreResult<bool>;

    /// Exact-match lookup.
    fn get(&self, path: &str) -> StoreResult<Option<CacheEntry>>;

    /// Drop every cache entry and restart id assignment at 1.
    fn clear_all(&self) -> StoreResult<()>;

    /// Number of cached entries.
    fn cache_len(&self) -> StoreResult<usize>;

    /// Replace the origin URL. Rejects anything that is not an absolute URL
    /// and leaves the previous value in place.
    fn set_origin(&self, url: &str) -> StoreResult<()>;

    fn get_origin(&self) -> StoreResult<Option<String>>;

    fn set_port(&self, port: u16) -> StoreResult<()>;

    /// Null the port slot. The slot itself is never deleted.
    fn unset_port(&self) -> StoreResult<()>;

    fn get_port(&self) -> StoreResult<Option<u16>>;

    /// Server start: clear the cache, record `port` and `origin`, all or
    /// nothing.
    fn reset(&self, port: u16, origin: &str) -> StoreResult<()>;

    /// Server stop: clear the cache and null the port, all or nothing.
    fn release(&self) -> StoreResult<()>;
}

/// Check that `raw` parses as an absolute URL.
pub fn validate_origin(raw: &str) -> StoreResult<()> {
    match url::Url::parse(raw) {
        Ok(_) => Ok(()),
        Err(_) => Err(StoreError::InvalidOrigin(raw.to_string())),
    }
}

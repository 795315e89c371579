use std::sync::Arc;

use bytes::Bytes;
use stash_store::{ConfigStore, StoreError};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::{ProxyError, build_client};

/// Where a resolved body came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value for the `X-Cache` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    pub fn was_cache(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

/// Result of [`CacheAsideFetcher::resolve`].
#[derive(Debug)]
pub struct Resolved {
    pub body: Bytes,
    pub cache: CacheStatus,
    /// Set when the body was fetched but storing it failed. The body is still
    /// good to serve.
    pub cache_error: Option<StoreError>,
}

// =======================================================
// URL → CACHE KEY
// =======================================================

/// Only path + query take part in the key. Scheme and host are ignored
/// because one origin is configured at a time.
///
/// - "https://example.org/a/b"      -> "/a/b"
/// - "https://example.org/a?x=1"    -> "/a?x=1"
/// - "https://example.org/a?"       -> "/a"
pub fn cache_key(url: &Url) -> String {
    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
        _ => url.path().to_string(),
    }
}

/// Build the upstream URL for an incoming request.
///
/// - origin trailing '/' is dropped so "https://o/" + "/x" -> "https://o/x"
/// - ensures the request part starts with '/'
pub fn join_origin(origin: &str, path_and_query: &str) -> String {
    let base = origin.trim_end_matches('/');
    if path_and_query.starts_with('/') {
        format!("{base}{path_and_query}")
    } else {
        format!("{base}/{path_and_query}")
    }
}

/// Cache-aside lookup in front of the origin.
///
/// Two concurrent misses on the same path both go to the origin; the store's
/// first-writer-wins `put` keeps the first body.
#[derive(Clone)]
pub struct CacheAsideFetcher {
    store: Arc<dyn ConfigStore>,
    client: reqwest::Client,
}

impl CacheAsideFetcher {
    pub fn new(store: Arc<dyn ConfigStore>) -> Result<Self, ProxyError> {
        Ok(Self::with_client(store, build_client()?))
    }

    pub fn with_client(store: Arc<dyn ConfigStore>, client: reqwest::Client) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Return the cached body for `target_url`, or fetch it from the origin
    /// and cache it.
    #[instrument(skip(self), fields(cache_key = tracing::field::Empty))]
    pub async fn resolve(&self, target_url: &str) -> Result<Resolved, ProxyError> {
        // 1) absolute URL only
        let url =
            Url::parse(target_url).map_err(|_| ProxyError::InvalidUrl(target_url.to_string()))?;

        // 2) key = path + query
        let key = cache_key(&url);
        tracing::Span::current().record("cache_key", key.as_str());

        // 3) HIT: no network
        if let Some(entry) = self.store.get(&key)? {
            debug!(target: "stash::proxy", cache_key = %key, "Cache hit");
            return Ok(Resolved {
                body: Bytes::from(entry.data),
                cache: CacheStatus::Hit,
                cache_error: None,
            });
        }

        // 4) MISS: GET from origin, store on 2xx
        info!(target: "stash::proxy", upstream = %url, "Cache miss; fetching from origin");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProxyError::unreachable(target_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::upstream_status(target_url, status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::unreachable(target_url, &e))?;

        let cache_error = match self.store.put(&key, &body) {
            Ok(true) => {
                debug!(target: "stash::proxy", cache_key = %key, bytes = body.len(), "Stored response");
                None
            }
            Ok(false) => {
                debug!(
                    target: "stash::proxy",
                    cache_key = %key,
                    "Concurrent fetch stored this path first; keeping earlier body"
                );
                None
            }
            Err(e) => {
                error!(
                    target: "stash::proxy",
                    cache_key = %key,
                    error = ?e,
                    "Failed to store fetched response; serving it uncached"
                );
                Some(e)
            }
        };

        Ok(Resolved {
            body,
            cache: CacheStatus::Miss,
            cache_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{cache_key, join_origin};

    #[test]
    fn cache_key_ignores_scheme_and_host() {
        let a = Url::parse("https://example.org/some/path?x=1").unwrap();
        let b = Url::parse("http://other.test:8080/some/path?x=1").unwrap();
        assert_eq!(cache_key(&a), "/some/path?x=1");
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn cache_key_drops_empty_query() {
        let url = Url::parse("https://example.org/a?").unwrap();
        assert_eq!(cache_key(&url), "/a");

        let root = Url::parse("https://example.org").unwrap();
        assert_eq!(cache_key(&root), "/");
    }

    #[test]
    fn join_origin_handles_slashes() {
        assert_eq!(
            join_origin("https://example.org", "/some/path"),
            "https://example.org/some/path"
        );
        assert_eq!(
            join_origin("https://example.org/", "/some/path?q=1"),
            "https://example.org/some/path?q=1"
        );
        assert_eq!(join_origin("http://h:1/base", "x"), "http://h:1/base/x");
    }
}

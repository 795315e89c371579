use http::Response;
use stash_http::{Body, responses};
use stash_proxy::{ProxyError, join_origin};
use tracing::{error, info, warn};

use crate::state::AppState;

/// Proxy one request path to the configured origin through the cache.
///
/// Flow:
/// - origin missing  -> 500, no network call
/// - origin present  -> fetcher.resolve(origin + path_and_query)
/// - ok              -> 200 + body + X-Cache
/// - error           -> status from `ProxyError::status_code`
pub async fn handle(path_and_query: &str, state: &AppState) -> Response<Body> {
    let origin = match state.store.get_origin() {
        Ok(Some(origin)) => origin,
        Ok(None) => return fail(path_and_query, ProxyError::NoOriginConfigured),
        Err(e) => return fail(path_and_query, ProxyError::Store(e)),
    };

    let target = join_origin(&origin, path_and_query);

    match state.fetcher.resolve(&target).await {
        Ok(resolved) => {
            if let Some(e) = &resolved.cache_error {
                warn!(
                    target: "stash::proxy",
                    path = %path_and_query,
                    error = %e,
                    "Serving response that could not be cached"
                );
            }

            info!(
                target: "stash::proxy",
                path = %path_and_query,
                cache = resolved.cache.as_str(),
                bytes = resolved.body.len(),
                "Request served"
            );
            responses::cached(resolved.body, resolved.cache.as_str())
        }
        Err(e) => fail(path_and_query, e),
    }
}

fn fail(path: &str, err: ProxyError) -> Response<Body> {
    let status = err.status_code();
    error!(
        target: "stash::proxy",
        %path,
        status = status.as_u16(),
        error = %err,
        "Proxy request failed"
    );

    if err.is_client_visible() {
        responses::text(status, err.to_string())
    } else {
        responses::status_only(status)
    }
}

use http::{Method, Request, Response};
use stash_http::{Body, responses};
use stash_proxy::CLEAR_CACHE_PATH;
use tracing::{debug, warn};

use crate::{
    handlers::{control, proxy},
    state::AppState,
};

/// Route one request.
///
/// - `GET /clearCache`      -> control handler
/// - `HEAD /clearCache`     -> 405, HEAD never clears
/// - `GET|HEAD <anything>`  -> proxy handler
/// - other methods          -> 405
///
/// The request body is never read, so any body type works.
pub async fn route<B>(req: Request<B>, state: &AppState) -> Response<Body> {
    let method = req.method().clone();
    if method != Method::GET && method != Method::HEAD {
        warn!(
            target: "stash::router",
            %method,
            path = %req.uri().path(),
            "Unsupported method; returning 405"
        );
        return responses::method_not_allowed("GET, HEAD");
    }

    if req.uri().path() == CLEAR_CACHE_PATH {
        if method != Method::GET {
            warn!(
                target: "stash::router",
                %method,
                "Cache clear only accepts GET; returning 405"
            );
            return responses::method_not_allowed("GET");
        }
        return control::clear_cache(state);
    }

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    drop(req);

    debug!(target: "stash::router", %method, path = %path_and_query, "Proxying request");
    proxy::handle(&path_and_query, state).await
}

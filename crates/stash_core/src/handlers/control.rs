use http::Response;
use stash_http::{Body, responses};
use tracing::{error, info};

use crate::state::AppState;

/// `GET /clearCache`: drop every cache entry. Origin and port stay as they are.
pub fn clear_cache(state: &AppState) -> Response<Body> {
    match state.store.clear_all() {
        Ok(()) => {
            info!(target: "stash::control", "Cache cleared");
            responses::no_content()
        }
        Err(e) => {
            error!(target: "stash::control", error = ?e, "Failed to clear cache");
            responses::internal_error()
        }
    }
}

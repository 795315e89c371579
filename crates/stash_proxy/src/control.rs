use std::sync::Arc;

use stash_store::ConfigStore;
use tracing::{debug, info};

use crate::{ProxyError, build_client};

/// Control endpoint served by a running proxy.
pub const CLEAR_CACHE_PATH: &str = "/clearCache";

/// Client side of the control channel.
///
/// The server writes its port to the store when it starts listening and nulls
/// it on stop; this client only ever learns where to connect from there.
#[derive(Clone)]
pub struct ControlClient {
    store: Arc<dyn ConfigStore>,
    client: reqwest::Client,
    host: String,
}

impl ControlClient {
    pub fn new(store: Arc<dyn ConfigStore>) -> Result<Self, ProxyError> {
        Ok(Self {
            store,
            client: build_client()?,
            host: "localhost".to_string(),
        })
    }

    /// Connect to `host` instead of `localhost`.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Control URL for a server listening on `port`.
    pub fn endpoint(&self, port: u16) -> String {
        format!("http://{}:{port}{CLEAR_CACHE_PATH}", self.host)
    }

    /// Ask the running server to drop its whole cache.
    pub async fn clear_remote_cache(&self) -> Result<(), ProxyError> {
        let Some(port) = self.store.get_port()? else {
            debug!(target: "stash::control", "Port registry is empty");
            return Err(ProxyError::NoServerRunning);
        };

        let url = self.endpoint(port);
        info!(target: "stash::control", %url, "Requesting cache clear");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProxyError::unreachable(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::upstream_status(&url, status));
        }

        debug!(target: "stash::control", %status, "Cache cleared on running server");
        Ok(())
    }
}

use std::sync::Arc;

use stash_proxy::{CacheAsideFetcher, ProxyError};
use stash_store::ConfigStore;

/// Everything a request handler needs, cloned into every connection task.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConfigStore>,
    pub fetcher: CacheAsideFetcher,
}

impl AppState {
    pub fn new(store: Arc<dyn ConfigStore>) -> Result<Self, ProxyError> {
        let fetcher = CacheAsideFetcher::new(store.clone())?;
        Ok(Self { store, fetcher })
    }
}

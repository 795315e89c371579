use stash_proxy::ProxyError;
use stash_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("Failed to bind port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Setup(#[from] ProxyError),

    #[error("Accept loop terminated abnormally: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServerError {
    pub fn is_bind_failed(&self) -> bool {
        matches!(self, ServerError::BindFailed { .. })
    }
}

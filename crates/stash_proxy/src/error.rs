use http::StatusCode;
use stash_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The origin (or the control endpoint) answered with a non-2xx status,
    /// or could not be reached at all (`status` is `None`).
    #[error("Request failed: {detail} {url}")]
    RequestFailed {
        url: String,
        status: Option<StatusCode>,
        detail: String,
    },

    #[error("No origin URL configured")]
    NoOriginConfigured,

    #[error("No proxy server is running (no port registered)")]
    NoServerRunning,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    ClientSetup(reqwest::Error),
}

impl ProxyError {
    pub(crate) fn upstream_status(url: &str, status: StatusCode) -> Self {
        ProxyError::RequestFailed {
            url: url.to_string(),
            status: Some(status),
            detail: status.to_string(),
        }
    }

    pub(crate) fn unreachable(url: &str, err: &reqwest::Error) -> Self {
        ProxyError::RequestFailed {
            url: url.to_string(),
            status: None,
            detail: format!("({err})"),
        }
    }

    /// HTTP status the proxy answers with when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::RequestFailed {
                status: Some(status),
                ..
            } => *status,
            ProxyError::RequestFailed { status: None, .. } => StatusCode::BAD_GATEWAY,
            ProxyError::NoOriginConfigured
            | ProxyError::NoServerRunning
            | ProxyError::Store(_)
            | ProxyError::ClientSetup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe and useful to echo back to the client.
    pub fn is_client_visible(&self) -> bool {
        matches!(
            self,
            ProxyError::InvalidUrl(_) | ProxyError::RequestFailed { .. }
        )
    }
}

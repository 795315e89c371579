//! Server side of the proxy: listener lifecycle, routing and handlers.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use server::{ProxyServer, RunningServer};
pub use state::AppState;

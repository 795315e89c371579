pub mod responses;

pub use responses::{Body, X_CACHE};

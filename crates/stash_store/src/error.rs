use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Cannot prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_invalid_origin(&self) -> bool {
        matches!(self, StoreError::InvalidOrigin(_))
    }
}

//! Storage error types

/// Errors raised by a [`KeyValueStore`](crate::store::KeyValueStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] async_sqlite::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

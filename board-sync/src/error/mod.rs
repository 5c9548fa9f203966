//! Error types

mod store;
mod transport;

pub use store::*;
pub use transport::*;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request to the leaderboard server failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Persistent storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

//! Persistent key-value storage.
//!
//! The storage backend and the cached identity both live here. Values are
//! plain strings and must round-trip exactly; callers do their own parsing.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// String key-value storage shared by every page of a profile.
///
/// Each key has a single logical writer, so implementations only need
/// last-writer-wins semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value for a key.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set the value for a key.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

//! Persistence backends carrying page state across a full reload.
//!
//! Two interchangeable media are supported. [`StorageBackend`] writes keys
//! into a [`KeyValueStore`] and reloads the same URL; [`QueryBackend`] encodes
//! the state into the reload URL itself. One is authoritative per deployment.

mod query;
mod storage;

pub use query::QueryBackend;
pub use storage::StorageBackend;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::BackendKind;
use crate::config::StorageKeys;
use crate::error::StoreError;
use crate::sort::RawSort;
use crate::sort::SortState;
use crate::store::KeyValueStore;

/// State read back on page load, before validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Stored auto-reload preference, if any.
    pub auto_reload: Option<bool>,
    /// Stored sort, if both index and direction were present and parseable.
    pub sort: Option<RawSort>,
}

/// Page state at the moment a reload is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// Active sort, `None` if no column is sorted.
    pub sort: Option<SortState>,
    /// Current auto-reload preference.
    pub auto_reload: bool,
}

/// A medium for page state.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Which medium this is.
    fn kind(&self) -> BackendKind;

    /// Reads whatever state the previous page left behind.
    async fn load(&self, location: &Url) -> Result<PersistedState, StoreError>;

    /// Records the sort of the table that is about to be reloaded.
    async fn persist_sort(&self, sort: SortState) -> Result<(), StoreError>;

    /// Records the auto-reload preference.
    async fn persist_auto_reload(&self, enabled: bool) -> Result<(), StoreError>;

    /// Computes where the reload navigates to.
    fn reload_target(&self, location: &Url, state: &PageState) -> Url;
}

/// Builds the backend selected by `kind`.
///
/// The query backend ignores `store`: its state never leaves the URL.
pub fn for_kind(
    kind: BackendKind,
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
) -> Arc<dyn PersistenceBackend> {
    match kind {
        BackendKind::Storage => Arc::new(StorageBackend::new(store, keys)),
        BackendKind::Query => Arc::new(QueryBackend::new(keys)),
    }
}

/// Decodes the stored auto-reload flag. Only `"1"` enables it.
pub(crate) fn decode_auto_reload(value: &str) -> bool {
    value == "1"
}

/// Encodes the auto-reload flag.
pub(crate) fn encode_auto_reload(enabled: bool) -> &'static str {
    if enabled { "1" } else { "0" }
}

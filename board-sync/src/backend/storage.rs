//! Persistent storage backend.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::PageState;
use super::PersistedState;
use super::PersistenceBackend;
use super::decode_auto_reload;
use super::encode_auto_reload;
use crate::config::BackendKind;
use crate::config::StorageKeys;
use crate::error::StoreError;
use crate::sort::RawSort;
use crate::sort::SortState;
use crate::sort::decode_column;
use crate::sort::decode_direction;
use crate::sort::encode_direction;
use crate::store::KeyValueStore;

/// Keeps page state in a [`KeyValueStore`].
///
/// A reload is a plain navigation to the current URL; the next page finds
/// its state in the store.
#[derive(Clone)]
pub struct StorageBackend {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl StorageBackend {
    /// Creates a storage backend over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self { store, keys }
    }
}

#[async_trait]
impl PersistenceBackend for StorageBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Storage
    }

    async fn load(&self, _location: &Url) -> Result<PersistedState, StoreError> {
        let auto_reload = self
            .store
            .get(&self.keys.auto_reload)
            .await?
            .map(|value| decode_auto_reload(&value));

        let column = self.store.get(&self.keys.sort_index).await?;
        let descending = self.store.get(&self.keys.descending).await?;
        let sort = column
            .as_deref()
            .and_then(decode_column)
            .zip(descending.as_deref().and_then(decode_direction))
            .map(|(column, descending)| RawSort { column, descending });

        Ok(PersistedState { auto_reload, sort })
    }

    async fn persist_sort(&self, sort: SortState) -> Result<(), StoreError> {
        self.store
            .set(&self.keys.sort_index, &sort.column.to_string())
            .await?;
        self.store
            .set(&self.keys.descending, encode_direction(sort.descending))
            .await
    }

    async fn persist_auto_reload(&self, enabled: bool) -> Result<(), StoreError> {
        self.store
            .set(&self.keys.auto_reload, encode_auto_reload(enabled))
            .await
    }

    fn reload_target(&self, location: &Url, _state: &PageState) -> Url {
        location.clone()
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

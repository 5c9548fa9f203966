//! Query string backend.

use async_trait::async_trait;
use url::Url;

use super::PageState;
use super::PersistedState;
use super::PersistenceBackend;
use super::decode_auto_reload;
use super::encode_auto_reload;
use crate::codec::QueryParameters;
use crate::codec::decode_parameters;
use crate::codec::encode_parameters;
use crate::config::BackendKind;
use crate::config::StorageKeys;
use crate::error::StoreError;
use crate::sort::RawSort;
use crate::sort::SortState;
use crate::sort::decode_column;
use crate::sort::decode_direction;
use crate::sort::encode_direction;

/// Carries page state in the reload URL (`?autoreload=1&sortindex=3&desc=0`).
///
/// Nothing is written anywhere: persisting is a no-op and the state travels
/// in the navigation target built by [`reload_target`](PersistenceBackend::reload_target).
#[derive(Debug, Clone, Default)]
pub struct QueryBackend {
    keys: StorageKeys,
}

impl QueryBackend {
    /// Creates a query backend using `keys` as parameter names.
    pub fn new(keys: StorageKeys) -> Self {
        Self { keys }
    }

    fn read(&self, params: &QueryParameters) -> PersistedState {
        let auto_reload = params
            .get(&self.keys.auto_reload)
            .map(|value| value.as_str().is_some_and(decode_auto_reload));

        let sort = params
            .value(&self.keys.sort_index)
            .and_then(decode_column)
            .zip(params.value(&self.keys.descending).and_then(decode_direction))
            .map(|(column, descending)| RawSort { column, descending });

        PersistedState { auto_reload, sort }
    }
}

#[async_trait]
impl PersistenceBackend for QueryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Query
    }

    async fn load(&self, location: &Url) -> Result<PersistedState, StoreError> {
        let search = location.query().map(|q| format!("?{}", q)).unwrap_or_default();
        Ok(decode_parameters(&search)
            .map(|params| self.read(&params))
            .unwrap_or_default())
    }

    async fn persist_sort(&self, _sort: SortState) -> Result<(), StoreError> {
        Ok(())
    }

    async fn persist_auto_reload(&self, _enabled: bool) -> Result<(), StoreError> {
        Ok(())
    }

    fn reload_target(&self, location: &Url, state: &PageState) -> Url {
        let column;
        let mut pairs = vec![(
            self.keys.auto_reload.as_str(),
            encode_auto_reload(state.auto_reload),
        )];
        if let Some(sort) = state.sort {
            column = sort.column.to_string();
            pairs.push((self.keys.sort_index.as_str(), column.as_str()));
            pairs.push((self.keys.descending.as_str(), encode_direction(sort.descending)));
        }

        let mut target = location.clone();
        target.set_query(Some(&encode_parameters(pairs)));
        target
    }
}

//! Synchronization configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::sort::SortState;

/// Which medium carries page state across a reload.
///
/// Only one backend is authoritative per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// State lives in persistent storage; a reload is a plain navigation.
    #[default]
    Storage,
    /// State rides along in the reload URL's query string.
    Query,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => f.write_str("storage"),
            Self::Query => f.write_str("query"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage" => Ok(Self::Storage),
            "query" => Ok(Self::Query),
            other => Err(format!("unknown backend '{other}' (expected 'storage' or 'query')")),
        }
    }
}

/// Key names used for page state.
///
/// The same names serve as query parameters for the query backend and as
/// storage keys for the storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Auto-reload preference (`"1"`/`"0"`).
    pub auto_reload: String,
    /// Sorted column index (integer string).
    pub sort_index: String,
    /// Sort direction (`"1"` descending, `"0"` ascending).
    pub descending: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            auto_reload: "autoreload".to_string(),
            sort_index: "sortindex".to_string(),
            descending: "desc".to_string(),
        }
    }
}

/// Configuration for a page session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use board_sync::{BackendKind, SyncConfig};
///
/// let config = SyncConfig::new(5)
///     .with_backend(BackendKind::Query)
///     .with_poll_interval(Duration::from_secs(2));
/// assert_eq!(config.column_count, 5);
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of columns in the table.
    ///
    /// Default: 5 (participant, submission time, train, valid, test)
    pub column_count: usize,

    /// Sort applied when nothing valid was persisted.
    ///
    /// Default: column 1, descending
    pub default_sort: SortState,

    /// Period of the change poll.
    ///
    /// Default: 1 second
    pub poll_interval: Duration,

    /// Timeout for a single change poll request. Kept under the poll
    /// interval so in-flight requests cannot pile up.
    ///
    /// Default: 900 milliseconds
    pub request_timeout: Duration,

    /// Persistence medium.
    ///
    /// Default: [`BackendKind::Storage`]
    pub backend: BackendKind,

    /// Key names for persisted state.
    pub storage_keys: StorageKeys,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            column_count: 5,
            default_sort: SortState::default(),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_millis(900),
            backend: BackendKind::default(),
            storage_keys: StorageKeys::default(),
        }
    }
}

impl SyncConfig {
    /// Creates a config for a table of `column_count` columns.
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            ..Default::default()
        }
    }

    /// Sets the fallback sort.
    pub fn with_default_sort(mut self, sort: SortState) -> Self {
        self.default_sort = sort;
        self
    }

    /// Sets the poll period.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the persistence backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the key names.
    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = keys;
        self
    }
}

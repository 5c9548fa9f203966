//! Leaderboard reload synchronization
//!
//! Keeps a sortable leaderboard table's sort order stable across full page
//! reloads and reloads the page when the server reports a new data version.
//! The page itself (location, navigation, header markup) is reached through
//! traits so the same logic runs in any host.

pub mod backend;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod poller;
pub mod preference;
pub mod sort;
pub mod store;
pub mod tracker;

mod client;

pub use client::*;
pub use config::BackendKind;
pub use config::StorageKeys;
pub use config::SyncConfig;
pub use coordinator::Navigator;
pub use coordinator::ReloadCoordinator;
pub use coordinator::RestoredState;
pub use sort::SortState;

//! Reload coordination for one page.
//!
//! A [`ReloadCoordinator`] lives from page load to the navigation that ends
//! the page. It restores the previous page's state on load, saves the
//! current state right before a reload, and owns everything that used to
//! be page-global: the auto-reload preference, the poll state and the
//! reload latch.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use log::info;
use log::warn;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backend::PageState;
use crate::backend::PersistenceBackend;
use crate::config::SyncConfig;
use crate::error::Error;
use crate::poller::ChangeSource;
use crate::poller::PollState;
use crate::poller::Poller;
use crate::poller::ReloadTrigger;
use crate::preference::AutoReloadPreference;
use crate::sort::SortState;
use crate::sort::resolve_sort;
use crate::tracker::SortSource;

/// The page's view of the browser: where it is and how to leave.
pub trait Navigator: Send + Sync {
    /// Current location, including any query string.
    fn location(&self) -> Url;

    /// Performs a full navigation to `target`, ending this page.
    fn navigate(&self, target: Url);
}

/// State to apply before the sort widget initializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoredState {
    /// Initial sort of the table.
    pub sort: SortState,
    /// Initial auto-reload preference.
    pub auto_reload: bool,
}

/// Coordinates persistence, restoration and reloads for one page.
///
/// # Example
///
/// ```ignore
/// let coordinator = Arc::new(ReloadCoordinator::new(config, backend, tracker, navigator));
/// let restored = coordinator.restore_on_load().await;
/// table.init_sort(restored.sort);
/// tokio::spawn(coordinator.clone().run_poller(client));
/// ```
pub struct ReloadCoordinator {
    config: SyncConfig,
    backend: Arc<dyn PersistenceBackend>,
    sort_source: Arc<dyn SortSource>,
    navigator: Arc<dyn Navigator>,
    preference: AutoReloadPreference,
    poll: Arc<PollState>,
    reloading: AtomicBool,
    page: CancellationToken,
}

impl ReloadCoordinator {
    /// Creates the coordinator for a freshly loaded page.
    ///
    /// The preference starts off until [`restore_on_load`](Self::restore_on_load) runs.
    pub fn new(
        config: SyncConfig,
        backend: Arc<dyn PersistenceBackend>,
        sort_source: Arc<dyn SortSource>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            backend,
            sort_source,
            navigator,
            preference: AutoReloadPreference::default(),
            poll: Arc::new(PollState::new()),
            reloading: AtomicBool::new(false),
            page: CancellationToken::new(),
        }
    }

    /// Reads what the previous page persisted and adopts its preference.
    ///
    /// Never fails: unreadable storage and invalid sort state both fall back
    /// to the configured defaults.
    pub async fn restore_on_load(&self) -> RestoredState {
        let location = self.navigator.location();
        let persisted = match self.backend.load(&location).await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Could not read persisted page state, using defaults: {}", e);
                Default::default()
            }
        };

        let sort = resolve_sort(persisted.sort, self.config.column_count, self.config.default_sort);
        let auto_reload = persisted.auto_reload.unwrap_or(false);
        self.preference.set(auto_reload);

        info!(
            "Restored page state from {}: sort column {} {}, auto-reload {}",
            self.backend.kind(),
            sort.column,
            if sort.descending { "desc" } else { "asc" },
            if auto_reload { "on" } else { "off" },
        );

        RestoredState { sort, auto_reload }
    }

    /// Saves the current state and computes where the reload goes.
    ///
    /// A table with no sorted column leaves the stored sort untouched.
    pub async fn prepare_reload(&self) -> Result<Url, Error> {
        let state = PageState {
            sort: self.sort_source.active_sort(),
            auto_reload: self.preference.is_enabled(),
        };

        if let Some(sort) = state.sort {
            self.backend.persist_sort(sort).await?;
        }
        self.backend.persist_auto_reload(state.auto_reload).await?;

        Ok(self.backend.reload_target(&self.navigator.location(), &state))
    }

    /// Reloads the page.
    ///
    /// Only the first call navigates; the page is gone after it, so later
    /// calls return `None`. The page token is cancelled after navigation. If saving state fails the page still reloads,
    /// to its current location.
    pub async fn reload(&self) -> Option<Url> {
        if self.reloading.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.poll.mark_reloading();

        let target = match self.prepare_reload().await {
            Ok(target) => target,
            Err(e) => {
                warn!("Could not save page state before reload: {}", e);
                self.navigator.location()
            }
        };

        info!("Reloading to {}", target);
        // Hosts load the next page once the token fires, so the location
        // must already be the target by then.
        self.navigator.navigate(target.clone());
        self.page.cancel();
        Some(target)
    }

    /// Manual reload button: ignores the auto-reload preference.
    pub async fn reload_now(&self) -> Option<Url> {
        self.reload().await
    }

    /// Auto-reload checkbox.
    ///
    /// The new value is persisted immediately. Switching on also reloads at
    /// once; the returned URL is the navigation target in that case.
    pub async fn set_auto_reload(&self, enabled: bool) -> Option<Url> {
        let toggle = self.preference.set(enabled);
        if let Err(e) = self.backend.persist_auto_reload(enabled).await {
            warn!("Could not persist auto-reload preference: {}", e);
        }

        if toggle.forces_reload() {
            self.reload().await
        } else {
            None
        }
    }

    /// Current auto-reload preference.
    pub fn auto_reload(&self) -> bool {
        self.preference.is_enabled()
    }

    /// Returns `true` once the page has started navigating away.
    pub fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::Acquire)
    }

    /// Poll state of this page.
    pub fn poll_state(&self) -> &Arc<PollState> {
        &self.poll
    }

    /// Token cancelled when the page navigates away.
    pub fn page_token(&self) -> CancellationToken {
        self.page.clone()
    }

    /// Configuration of this page.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Builds the change poller for this page.
    pub fn poller(&self, source: Arc<dyn ChangeSource>) -> Poller {
        Poller::new(
            source,
            Arc::clone(&self.poll),
            self.config.poll_interval,
            self.config.request_timeout,
        )
    }

    /// Polls `source` until the page reloads.
    pub async fn run_poller(self: Arc<Self>, source: Arc<dyn ChangeSource>) {
        let poller = self.poller(source);
        let page = self.page_token();
        poller.run(self, page).await;
    }
}

#[async_trait]
impl ReloadTrigger for ReloadCoordinator {
    fn auto_reload_enabled(&self) -> bool {
        self.preference.is_enabled()
    }

    async fn data_changed(&self) {
        self.reload().await;
    }
}

impl std::fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("config", &self.config)
            .field("backend", &self.backend.kind())
            .field("auto_reload", &self.preference.is_enabled())
            .field("poll", &self.poll)
            .field("reloading", &self.is_reloading())
            .finish_non_exhaustive()
    }
}

//! Headless stand-ins for the rendered table and the browser window.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use board_sync::SortState;
use board_sync::coordinator::Navigator;
use board_sync::tracker::ASC_MARKER;
use board_sync::tracker::DESC_MARKER;
use board_sync::tracker::HeaderMarkup;
use board_sync::tracker::header_id;
use log::info;
use url::Url;

/// Header row of the ranking table.
///
/// Renders the same classes the sorting widget puts on header cells, so the
/// library reads the sort back exactly as it would from a real page.
pub struct HeadlessTable {
    column_count: usize,
    sort: RwLock<Option<SortState>>,
}

impl HeadlessTable {
    pub fn new(column_count: usize) -> Arc<Self> {
        Arc::new(Self {
            column_count,
            sort: RwLock::new(None),
        })
    }

    /// Applies a sort, as widget initialization or a header click would.
    ///
    /// Columns outside the table are ignored and `false` is returned.
    pub fn sort_by(&self, sort: SortState) -> bool {
        if !sort.fits(self.column_count) {
            return false;
        }
        *self.sort.write().unwrap_or_else(PoisonError::into_inner) = Some(sort);
        true
    }

    /// The sort currently shown.
    pub fn sort(&self) -> Option<SortState> {
        *self.sort.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HeaderMarkup for HeadlessTable {
    fn header_class(&self, id: &str) -> Option<String> {
        let index = (0..self.column_count).find(|i| header_id(*i) == id)?;
        let class = match self.sort() {
            Some(sort) if sort.column == index && sort.descending => {
                format!("tablesorter-header {}", DESC_MARKER)
            }
            Some(sort) if sort.column == index => format!("tablesorter-header {}", ASC_MARKER),
            _ => "tablesorter-header".to_string(),
        };
        Some(class)
    }
}

/// Browser location. Navigation just moves it; the host loop notices the
/// ended page and loads the next one.
pub struct HeadlessBrowser {
    location: Mutex<Url>,
}

impl HeadlessBrowser {
    pub fn new(location: Url) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(location),
        })
    }
}

impl Navigator for HeadlessBrowser {
    fn location(&self) -> Url {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, target: Url) {
        info!("Navigating to {}", target);
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = target;
    }
}

//! Reading the active sort back from the rendered table.
//!
//! The sorting widget marks the active header cell with a class
//! (`tablesorter-headerAsc` / `tablesorter-headerDesc`). That markup is the
//! only record of what the user clicked, so it is read right before a reload.

use crate::sort::SortState;

/// Class marking an ascending active sort.
pub const ASC_MARKER: &str = "tablesorter-headerAsc";

/// Class marking a descending active sort.
pub const DESC_MARKER: &str = "tablesorter-headerDesc";

/// Anything that knows the table's active sort.
pub trait SortSource: Send + Sync {
    /// Returns the active sort, or `None` if no column is sorted.
    fn active_sort(&self) -> Option<SortState>;
}

/// Access to header cell markup.
pub trait HeaderMarkup: Send + Sync {
    /// Returns the class attribute of the element with the given id, or
    /// `None` if there is no such element.
    fn header_class(&self, id: &str) -> Option<String>;
}

impl<M: HeaderMarkup + ?Sized> HeaderMarkup for std::sync::Arc<M> {
    fn header_class(&self, id: &str) -> Option<String> {
        (**self).header_class(id)
    }
}

/// Positional identifier of a header cell.
pub fn header_id(index: usize) -> String {
    format!("th-{}", index)
}

/// Scans header cells `th-0..th-{column_count - 1}` for an active sort marker.
///
/// The widget guarantees at most one marked header; if several are marked
/// anyway, the last one scanned wins. Headers that do not exist are skipped.
pub fn capture_current_sort(markup: &dyn HeaderMarkup, column_count: usize) -> Option<SortState> {
    let mut active = None;
    for index in 0..column_count {
        let Some(class) = markup.header_class(&header_id(index)) else {
            continue;
        };
        if class.contains(ASC_MARKER) {
            active = Some(SortState::asc(index));
        } else if class.contains(DESC_MARKER) {
            active = Some(SortState::desc(index));
        }
    }
    active
}

/// [`SortSource`] reading header markup.
pub struct HeaderClassTracker<M> {
    markup: M,
    column_count: usize,
}

impl<M: HeaderMarkup> HeaderClassTracker<M> {
    /// Creates a tracker over `column_count` header cells.
    pub fn new(markup: M, column_count: usize) -> Self {
        Self {
            markup,
            column_count,
        }
    }
}

impl<M: HeaderMarkup> SortSource for HeaderClassTracker<M> {
    fn active_sort(&self) -> Option<SortState> {
        capture_current_sort(&self.markup, self.column_count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Headers(HashMap<String, String>);

    impl Headers {
        fn new(classes: &[&str]) -> Self {
            Self(
                classes
                    .iter()
                    .enumerate()
                    .map(|(i, class)| (header_id(i), class.to_string()))
                    .collect(),
            )
        }
    }

    impl HeaderMarkup for Headers {
        fn header_class(&self, id: &str) -> Option<String> {
            self.0.get(id).cloned()
        }
    }

    #[test]
    fn test_no_marker() {
        let headers = Headers::new(&["tablesorter-header", "tablesorter-header", ""]);
        assert_eq!(capture_current_sort(&headers, 3), None);
    }

    #[test]
    fn test_ascending_marker() {
        let headers = Headers::new(&[
            "tablesorter-header",
            "tablesorter-header",
            "tablesorter-header",
            "tablesorter-header tablesorter-headerAsc",
        ]);
        assert_eq!(capture_current_sort(&headers, 4), Some(SortState::asc(3)));
    }

    #[test]
    fn test_descending_marker() {
        let headers = Headers::new(&["tablesorter-header", "tablesorter-header tablesorter-headerDesc"]);
        assert_eq!(capture_current_sort(&headers, 2), Some(SortState::desc(1)));
    }

    #[test]
    fn test_last_marked_header_wins() {
        let headers = Headers::new(&["tablesorter-headerDesc", "x", "tablesorter-headerAsc"]);
        assert_eq!(capture_current_sort(&headers, 3), Some(SortState::asc(2)));
    }

    #[test]
    fn test_scan_limited_to_column_count() {
        let headers = Headers::new(&["", "", "tablesorter-headerAsc"]);
        assert_eq!(capture_current_sort(&headers, 2), None);
    }

    #[test]
    fn test_missing_headers_are_skipped() {
        let headers = Headers::new(&["tablesorter-headerAsc"]);
        assert_eq!(capture_current_sort(&headers, 5), Some(SortState::asc(0)));
    }

    #[test]
    fn test_tracker_is_sort_source() {
        let tracker = HeaderClassTracker::new(Headers::new(&["", "tablesorter-headerDesc"]), 2);
        assert_eq!(tracker.active_sort(), Some(SortState::desc(1)));
    }
}

//! Sort state of the leaderboard table.

use std::fmt;

/// The active sort of the table: which column, and in which direction.
///
/// "No column sorted" is expressed as `Option<SortState>::None` by the
/// tracker and the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortState {
    /// Zero-based column index.
    pub column: usize,
    /// `true` for descending order.
    pub descending: bool,
}

impl SortState {
    /// Creates an ascending sort on a column.
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    /// Creates a descending sort on a column.
    pub fn desc(column: usize) -> Self {
        Self {
            column,
            descending: true,
        }
    }

    /// Returns `true` if the column exists in a table of `column_count` columns.
    pub fn fits(&self, column_count: usize) -> bool {
        self.column < column_count
    }
}

impl Default for SortState {
    /// Submission time, newest first.
    fn default() -> Self {
        Self::desc(1)
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.descending { "desc" } else { "asc" };
        write!(f, "column {} {}", self.column, direction)
    }
}

/// Sort state as read back from persistence, before validation.
///
/// The column is kept signed because persisted values are untrusted: a
/// stored `-3` must be recognized as out of range, not wrap around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSort {
    pub column: i64,
    pub descending: bool,
}

impl RawSort {
    /// Validates against the table width.
    ///
    /// Returns `None` for a column outside `[0, column_count)`.
    pub fn validate(self, column_count: usize) -> Option<SortState> {
        let column = usize::try_from(self.column).ok()?;
        let state = SortState {
            column,
            descending: self.descending,
        };
        state.fits(column_count).then_some(state)
    }
}

impl From<SortState> for RawSort {
    fn from(state: SortState) -> Self {
        Self {
            column: state.column as i64,
            descending: state.descending,
        }
    }
}

/// Encodes a sort direction as persisted (`"1"` descending, `"0"` ascending).
pub fn encode_direction(descending: bool) -> &'static str {
    if descending { "1" } else { "0" }
}

/// Decodes a persisted sort direction. Anything but `"0"`/`"1"` is invalid.
pub fn decode_direction(value: &str) -> Option<bool> {
    match value {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Decodes a persisted column index. Values that are not integers are invalid.
pub fn decode_column(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Resolves what a freshly loaded page should sort by.
///
/// Missing, partial, unparsable or out-of-range state all yield `fallback`.
pub fn resolve_sort(raw: Option<RawSort>, column_count: usize, fallback: SortState) -> SortState {
    raw.and_then(|raw| raw.validate(column_count))
        .unwrap_or(fallback)
}

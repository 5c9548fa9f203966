//! Auto-reload preference.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Whether the page may reload itself when the server data changes.
///
/// Read once at page load, changed only by the user. Persisting each change
/// is the coordinator's job; this type only holds the current value.
#[derive(Debug, Default)]
pub struct AutoReloadPreference {
    enabled: AtomicBool,
}

/// Effect of setting the preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Switched off to on.
    Enabled,
    /// Switched on to off.
    Disabled,
    /// Already had the requested value.
    Unchanged,
}

impl Toggle {
    /// Switching on reloads at once so changes missed while off show up.
    pub fn forces_reload(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl AutoReloadPreference {
    /// Creates a preference with an initial value.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Returns the current value.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Sets the value and reports what changed.
    pub fn set(&self, enabled: bool) -> Toggle {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        match (previous, enabled) {
            (false, true) => Toggle::Enabled,
            (true, false) => Toggle::Disabled,
            _ => Toggle::Unchanged,
        }
    }
}

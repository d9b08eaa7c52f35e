//! Colour theme preference and the document-attribute boundary.

use std::str::FromStr;

use explor_types::Theme;
use tracing::debug;

use crate::storage::{KeyValueStorage, StorageError};

/// Storage key of the device theme preference.
pub const THEME_KEY: &str = "explor-theme";

/// Receives the active theme whenever dark mode changes.
///
/// In the browser build this sets `data-theme` on the document root.
pub trait ThemeSink: Send + Sync {
    /// Apply `theme` to whatever renders the UI.
    fn apply(&self, theme: Theme);
}

/// Read the stored theme preference.
///
/// Returns `None` when nothing is stored, so the caller can fall back to
/// the OS colour-scheme preference. Any stored value other than `"dark"`
/// reads as light.
pub fn read_theme_preference(storage: &dyn KeyValueStorage) -> Option<Theme> {
    match storage.get(THEME_KEY) {
        Ok(Some(raw)) if !raw.is_empty() => {
            Some(Theme::from_str(raw.trim()).unwrap_or(Theme::Light))
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "theme preference unreadable");
            None
        }
    }
}

/// Store the theme preference.
pub fn write_theme_preference(
    storage: &dyn KeyValueStorage,
    theme: Theme,
) -> Result<(), StorageError> {
    storage.set(THEME_KEY, theme.as_str())
}

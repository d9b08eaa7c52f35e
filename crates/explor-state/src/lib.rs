//! Session state for the Explor client.
//!
//! Two layers:
//!
//! - [`persist`] -- the device-local JSON blob, normalized on every read so
//!   corrupted or foreign-shaped data degrades to defaults
//! - [`app`] -- the [`AppState`] container every screen reads and mutates,
//!   writing persisted fields through to the store
//!
//! Storage backends live in [`storage`]; the colour theme preference and
//! its document boundary live in [`theme`].

pub mod app;
pub mod persist;
pub mod storage;
pub mod theme;

pub use app::{AppState, AppStateOptions, StateEvent, TOAST_DURATION, UiSnapshot};
pub use persist::{PersistedState, PersistedStatePatch, PersistedStore, STORAGE_KEY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use theme::{THEME_KEY, ThemeSink};

//! Device-local key-value storage.
//!
//! The browser build keeps state in `localStorage`; here the same string
//! blobs live behind [`KeyValueStorage`], with a file-backed implementation
//! for real sessions and an in-memory one for tests and throwaway sessions.
//!
//! # Key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `explor-prototype-state-v1` | JSON [`PersistedState`](crate::persist::PersistedState) |
//! | `explor-theme` | `"dark"` or `"light"` |

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Errors that can occur in a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        /// Storage key being accessed.
        key: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A value could not be serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String blobs addressed by key.
///
/// Methods are synchronous: callers are UI mutations that never suspend.
/// `AppState` writes through while holding its state lock, including from
/// Tokio tasks, so a [`FileStorage`] write blocks that worker for the
/// duration of the file I/O. The persisted blob is small; a backend with
/// slow writes should buffer them and return immediately.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value for `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// One file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store files under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced so a key can never
    /// escape the state directory.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_owned(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Write-then-rename so a crash mid-write leaves the old blob intact.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;

        tracing::trace!(key, path = %path.display(), bytes = value.len(), "storage value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// Process-local storage that forgets everything on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-seeded with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.lock().insert(key.to_owned(), value.to_owned());
        storage
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        assert!(storage.set("k", "v").is_ok());
        assert_eq!(storage.get("k").ok().flatten().as_deref(), Some("v"));
        assert!(storage.remove("k").is_ok());
        assert!(storage.remove("k").is_ok());
        assert_eq!(storage.get("k").ok().flatten(), None);
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));

        assert_eq!(storage.get("explor-theme").ok().flatten(), None);
        assert!(storage.set("explor-theme", "dark").is_ok());
        assert_eq!(
            storage.get("explor-theme").ok().flatten().as_deref(),
            Some("dark")
        );
        assert!(storage.remove("explor-theme").is_ok());
        assert!(storage.remove("explor-theme").is_ok());
        assert_eq!(storage.get("explor-theme").ok().flatten(), None);
    }

    #[test]
    fn file_storage_keys_cannot_escape_directory() {
        let storage = FileStorage::new("/tmp/explor");
        let path = storage.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/tmp/explor")));
    }
}

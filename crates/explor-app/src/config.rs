//! Configuration for the session driver.
//!
//! All configuration is loaded from environment variables. Every variable
//! is optional; an unset variable takes its default, a set but unparsable
//! one is an error.

use std::path::PathBuf;

use explor_collection::{DEFAULT_BASE_URL, DEFAULT_FEATURED_LIMIT};

use crate::error::AppError;

/// State directory used when no platform data directory can be resolved.
const FALLBACK_STATE_DIR: &str = ".explor";

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Collection API base URL, without a trailing slash.
    pub api_base_url: String,
    /// Directory holding the persisted state and theme files.
    pub state_dir: PathBuf,
    /// OS colour-scheme preference, used when no theme is stored.
    pub prefers_dark: bool,
    /// Number of featured artworks to load for the home screen.
    pub featured_limit: usize,
    /// Query typed into the explore screen at startup.
    pub initial_query: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `MET_API_BASE_URL` -- collection API base URL (default: the public Met API)
    /// - `EXPLOR_STATE_DIR` -- state directory (default: platform data dir, else `.explor`)
    /// - `EXPLOR_PREFERS_DARK` -- OS dark-mode preference (default `false`)
    /// - `EXPLOR_FEATURED_LIMIT` -- featured artworks on the home screen (default 10)
    /// - `EXPLOR_QUERY` -- initial explore query (default: none)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("MET_API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map_or_else(
                || DEFAULT_BASE_URL.to_owned(),
                |url| url.trim().trim_end_matches('/').to_owned(),
            );

        let state_dir = lookup("EXPLOR_STATE_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(default_state_dir, PathBuf::from);

        let prefers_dark: bool = lookup("EXPLOR_PREFERS_DARK")
            .unwrap_or_else(|| "false".to_owned())
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid EXPLOR_PREFERS_DARK: {e}")))?;

        let featured_limit: usize = lookup("EXPLOR_FEATURED_LIMIT")
            .unwrap_or_else(|| DEFAULT_FEATURED_LIMIT.to_string())
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid EXPLOR_FEATURED_LIMIT: {e}")))?;
        if featured_limit == 0 {
            return Err(AppError::Config(String::from(
                "EXPLOR_FEATURED_LIMIT must be at least 1",
            )));
        }

        let initial_query = lookup("EXPLOR_QUERY").filter(|q| !q.trim().is_empty());

        Ok(Self {
            api_base_url,
            state_dir,
            prefers_dark,
            featured_limit,
            initial_query,
        })
    }
}

/// Platform-local data directory for Explor, or `.explor` in the working
/// directory when the platform has none.
fn default_state_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "Explor", "explor").map_or_else(
        || PathBuf::from(FALLBACK_STATE_DIR),
        |dirs| dirs.data_local_dir().to_path_buf(),
    )
}

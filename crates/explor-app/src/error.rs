//! Error types for the session driver.

use explor_collection::CollectionError;

/// Errors that can occur while setting up or running a session.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// A collection API call failed.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),
}

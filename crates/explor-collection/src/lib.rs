//! Cached, cancellable client for the Met Collection API.
//!
//! Turns UI-level intents ("search for armor in department 4", "show ten
//! featured works") into requests against the three collection endpoints,
//! hiding per-object latency behind batched hydration.
//!
//! # Architecture
//!
//! ```text
//! search_artworks --> search_objects (/search)
//!                 \-> fetch_objects_by_ids --> fetch_object (/objects/{id}) x N
//!                                                  |
//!                                           CollectionCache
//! ```
//!
//! Every operation takes a [`CancellationToken`]; a cancelled operation
//! fails with [`CollectionError::Cancelled`], which callers ignore rather
//! than report.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod artwork;
pub mod cache;
pub mod client;
pub mod error;
pub mod query;

// Re-export primary types for convenience.
pub use cache::CollectionCache;
pub use client::{
    ArtworkPage, ArtworkSearch, CollectionClient, DEFAULT_BASE_URL, DEFAULT_FEATURED_LIMIT,
    DEFAULT_SEARCH_LIMIT, REQUEST_BATCH_SIZE, SearchResults,
};
pub use error::CollectionError;
pub use query::{DEFAULT_QUERY, SearchQuery};
pub use tokio_util::sync::CancellationToken;

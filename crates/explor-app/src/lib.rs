//! Screen-level orchestration for the Explor client.
//!
//! Sits on top of the collection client and the state container:
//!
//! - [`explore`] -- the explore screen's debounced, cancellable, paginated
//!   search session
//! - [`home`] -- the home screen's featured carousel
//! - [`config`] -- environment configuration for the session driver
//! - [`error`] -- the driver's error type

pub mod config;
pub mod error;
pub mod explore;
pub mod home;

pub use config::AppConfig;
pub use error::AppError;
pub use explore::{ExploreResults, ExploreSession, sort_artworks};
pub use home::load_featured;

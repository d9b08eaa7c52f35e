//! Shared type definitions for the Explor museum client.
//!
//! This crate is the single source of truth for the records that flow
//! between the collection API client, the application state container and
//! the browser front end. Types are exported to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers for artworks, departments and routes
//! - [`enums`] -- Explore controls, navigation and screen status enums
//! - [`structs`] -- Artwork, department, route and overlay records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    DepartmentFilter, Screen, ScreenStatus, SortBy, Tab, Theme, UnknownVariant, ViewMode,
};
pub use ids::{ArtworkId, DepartmentId, RouteId};
pub use structs::{
    Artwork, Department, ExploreControls, ExploreControlsPatch, RECENTLY_VIEWED_CAP,
    RecentlyViewedItem, RouteStop, SavedRoute, TicketSession,
};

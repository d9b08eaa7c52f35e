//! Entity structs shared by the collection client and the state container.
//!
//! Field names serialize in the camelCase shape the browser front end reads
//! from local storage, so a blob written by one build is readable by the next.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DepartmentFilter, SortBy, ViewMode};
use crate::ids::{ArtworkId, DepartmentId, RouteId};

/// Maximum number of entries kept in the recently-viewed list.
pub const RECENTLY_VIEWED_CAP: usize = 20;

// ---------------------------------------------------------------------------
// Collection entities
// ---------------------------------------------------------------------------

/// Normalized display record derived from one remote collection object.
///
/// Only built when the source object has both an id and a primary image;
/// see `explor_collection::artwork::map_object`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Artwork {
    /// Source object id.
    pub id: ArtworkId,
    /// Object title, `"Untitled"` when the source has none.
    pub title: String,
    /// Resolved artist, constituents, culture, or `"Unknown Artist"`.
    pub artist: String,
    /// Free-form date text (e.g. `"ca. 1665"`).
    pub date: String,
    /// Department display name.
    pub department: String,
    /// Medium description.
    pub medium: String,
    /// Dimensions description.
    pub dimensions: String,
    /// Gallery number inside the museum.
    pub gallery: String,
    /// Primary image URL.
    pub image: String,
    /// Up to ten secondary image URLs.
    #[serde(rename = "gallery_images")]
    pub gallery_images: Vec<String>,
    /// Short synthesized description.
    pub description: String,
    /// Up to eight unique tags, classification first when known.
    pub tags: Vec<String>,
    /// Collection web page for the object.
    pub source_url: String,
}

/// A curatorial department, used as a search facet and a map zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Department {
    /// Department id.
    pub department_id: DepartmentId,
    /// Human-readable name.
    pub display_name: String,
}

/// Reduced projection of an [`Artwork`] kept in the recently-viewed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RecentlyViewedItem {
    /// Source object id.
    pub id: ArtworkId,
    /// Object title.
    #[serde(default)]
    pub title: String,
    /// Resolved artist.
    #[serde(default)]
    pub artist: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: String,
    /// Department display name.
    #[serde(default)]
    pub department: String,
    /// Date text.
    #[serde(default)]
    pub date: String,
    /// Collection web page.
    #[serde(default)]
    pub source_url: String,
}

impl From<&Artwork> for RecentlyViewedItem {
    fn from(artwork: &Artwork) -> Self {
        Self {
            id: artwork.id,
            title: artwork.title.clone(),
            artist: artwork.artist.clone(),
            image: artwork.image.clone(),
            department: artwork.department.clone(),
            date: artwork.date.clone(),
            source_url: artwork.source_url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// One stop on a route timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RouteStop {
    /// Stop title (e.g. `"Start: Great Hall Entrance"`).
    #[serde(default)]
    pub name: String,
    /// Short detail line (e.g. `"~16 min"`).
    #[serde(default)]
    pub detail: String,
}

/// A visit route the user saved to their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SavedRoute {
    /// Route id, unique within the saved list.
    pub id: RouteId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Duration label (e.g. `"120 min"`).
    #[serde(default)]
    pub duration: String,
    /// Number of stops.
    #[serde(default, rename = "stops")]
    pub stop_count: u32,
    /// Department zones the route passes through.
    #[serde(default)]
    pub zones: Vec<String>,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Ordered stops.
    #[serde(default)]
    pub timeline: Vec<RouteStop>,
    /// Whether the route was built from the user's interest preferences.
    #[serde(default)]
    pub generated_from_preferences: bool,
}

// ---------------------------------------------------------------------------
// Explore controls
// ---------------------------------------------------------------------------

/// Current search/filter/sort/view configuration of the explore screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ExploreControls {
    /// Raw search text as typed.
    pub query: String,
    /// Department facet.
    #[ts(as = "String")]
    pub department_id: DepartmentFilter,
    /// Client-side ordering.
    pub sort_by: SortBy,
    /// Grid layout.
    pub view_mode: ViewMode,
}

/// Partial update of [`ExploreControls`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreControlsPatch {
    /// New search text.
    pub query: Option<String>,
    /// New department facet.
    pub department_id: Option<DepartmentFilter>,
    /// New ordering.
    pub sort_by: Option<SortBy>,
    /// New layout.
    pub view_mode: Option<ViewMode>,
}

impl ExploreControlsPatch {
    /// Patch that only replaces the query text.
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Patch that only replaces the department facet.
    pub fn department(department_id: DepartmentFilter) -> Self {
        Self {
            department_id: Some(department_id),
            ..Self::default()
        }
    }

    /// Whether applying this patch would change nothing.
    pub const fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.department_id.is_none()
            && self.sort_by.is_none()
            && self.view_mode.is_none()
    }
}

impl ExploreControls {
    /// Shallow-merge a patch, returning the merged controls.
    #[must_use]
    pub fn merged(&self, patch: ExploreControlsPatch) -> Self {
        Self {
            query: patch.query.unwrap_or_else(|| self.query.clone()),
            department_id: patch.department_id.unwrap_or(self.department_id),
            sort_by: patch.sort_by.unwrap_or(self.sort_by),
            view_mode: patch.view_mode.unwrap_or(self.view_mode),
        }
    }
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

/// Payload of the ticket checkout sheet. Session-only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TicketSession {
    /// Ticket type label (e.g. `"Adult"`).
    pub ticket: String,
    /// Chosen visit date.
    #[ts(as = "String")]
    pub visit_date: NaiveDate,
    /// Chosen entry time label (e.g. `"10:30 AM"`).
    pub time_label: String,
    /// Number of tickets.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DepartmentId;

    fn sample_artwork() -> Artwork {
        Artwork {
            id: ArtworkId(436_535),
            title: String::from("Wheat Field with Cypresses"),
            artist: String::from("Vincent van Gogh"),
            date: String::from("1889"),
            department: String::from("European Paintings"),
            medium: String::from("Oil on canvas"),
            dimensions: String::from("28 7/8 x 36 3/4 in."),
            gallery: String::from("822"),
            image: String::from("https://images.example/small.jpg"),
            gallery_images: Vec::new(),
            description: String::from("Painting"),
            tags: vec![String::from("Paintings")],
            source_url: String::from("https://www.metmuseum.org/art/collection/search/436535"),
        }
    }

    #[test]
    fn recently_viewed_projection_keeps_display_fields() {
        let artwork = sample_artwork();
        let item = RecentlyViewedItem::from(&artwork);
        assert_eq!(item.id, artwork.id);
        assert_eq!(item.title, artwork.title);
        assert_eq!(item.source_url, artwork.source_url);
    }

    #[test]
    fn artwork_uses_browser_field_names() {
        let value = serde_json::to_value(sample_artwork()).unwrap_or_default();
        assert!(value.get("sourceUrl").is_some());
        assert!(value.get("gallery_images").is_some());
        assert!(value.get("source_url").is_none());
    }

    #[test]
    fn saved_route_tolerates_missing_fields() {
        let route: Result<SavedRoute, _> = serde_json::from_value(serde_json::json!({
            "id": "route-1",
            "stops": 5
        }));
        let route = route.ok();
        assert_eq!(route.as_ref().map(|r| r.stop_count), Some(5));
        assert_eq!(route.map(|r| r.timeline.len()), Some(0));
    }

    #[test]
    fn explore_patch_merges_only_present_fields() {
        let current = ExploreControls {
            query: String::from("armor"),
            department_id: DepartmentFilter::Department(DepartmentId(4)),
            sort_by: SortBy::Title,
            view_mode: ViewMode::List,
        };
        let merged = current.merged(ExploreControlsPatch::query("helmet"));
        assert_eq!(merged.query, "helmet");
        assert_eq!(merged.department_id, current.department_id);
        assert_eq!(merged.sort_by, SortBy::Title);
        assert_eq!(merged.view_mode, ViewMode::List);
        assert!(ExploreControlsPatch::default().is_empty());
    }

    #[test]
    fn explore_controls_serialize_camel_case() {
        let value = serde_json::to_value(ExploreControls::default()).unwrap_or_default();
        assert_eq!(value.get("departmentId"), Some(&serde_json::json!("all")));
        assert_eq!(value.get("sortBy"), Some(&serde_json::json!("relevance")));
        assert_eq!(value.get("viewMode"), Some(&serde_json::json!("bento")));
    }
}

//! Persisted state: the JSON blob that survives restarts.
//!
//! Reads never fail. A missing, unparsable or foreign-shaped blob degrades
//! to defaults field by field, so corrupted storage can never take the
//! session down with it. Writes are read-merge-write against whatever is
//! currently stored, not against an in-memory mirror.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use explor_types::{
    ArtworkId, DepartmentFilter, ExploreControls, RECENTLY_VIEWED_CAP, RecentlyViewedItem,
    SavedRoute, SortBy, ViewMode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::storage::{KeyValueStorage, StorageError};

/// Storage key of the persisted state blob.
pub const STORAGE_KEY: &str = "explor-prototype-state-v1";

/// Everything the session keeps across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Whether the (simulated) user is signed in.
    pub is_logged_in: bool,
    /// Favorited artwork ids, insertion-ordered, no duplicates.
    pub favorites: Vec<ArtworkId>,
    /// Interest tags chosen in the profile, insertion-ordered, no duplicates.
    pub preferences: Vec<String>,
    /// Saved visit routes, most recently saved first.
    pub saved_routes: Vec<SavedRoute>,
    /// Recently opened artworks, most recent first.
    pub recently_viewed: Vec<RecentlyViewedItem>,
    /// Last explore screen configuration.
    pub explore_controls: ExploreControls,
}

/// Partial update of [`PersistedState`]; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedStatePatch {
    /// New signed-in flag.
    pub is_logged_in: Option<bool>,
    /// New favorites.
    pub favorites: Option<Vec<ArtworkId>>,
    /// New preferences.
    pub preferences: Option<Vec<String>>,
    /// New saved routes.
    pub saved_routes: Option<Vec<SavedRoute>>,
    /// New recently-viewed list.
    pub recently_viewed: Option<Vec<RecentlyViewedItem>>,
    /// New explore controls.
    pub explore_controls: Option<ExploreControls>,
}

impl From<PersistedState> for PersistedStatePatch {
    /// A patch that overwrites every field.
    fn from(state: PersistedState) -> Self {
        Self {
            is_logged_in: Some(state.is_logged_in),
            favorites: Some(state.favorites),
            preferences: Some(state.preferences),
            saved_routes: Some(state.saved_routes),
            recently_viewed: Some(state.recently_viewed),
            explore_controls: Some(state.explore_controls),
        }
    }
}

impl PersistedState {
    /// Parse a stored blob, normalizing every field.
    ///
    /// Anything that is not a JSON object yields [`PersistedState::default`].
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields),
            Ok(_) => {
                debug!("persisted state is not an object, using defaults");
                Self::default()
            }
            Err(e) => {
                debug!(error = %e, "persisted state is not valid JSON, using defaults");
                Self::default()
            }
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            is_logged_in: fields.get("isLoggedIn").is_some_and(is_truthy),
            favorites: normalize_favorites(fields.get("favorites")),
            preferences: normalize_preferences(fields.get("preferences")),
            saved_routes: normalize_saved_routes(fields.get("savedRoutes")),
            recently_viewed: normalize_recently_viewed(fields.get("recentlyViewed")),
            explore_controls: normalize_explore_controls(fields.get("exploreControls")),
        }
    }

    /// Apply a patch, returning the merged state.
    #[must_use]
    pub fn merged(self, patch: PersistedStatePatch) -> Self {
        Self {
            is_logged_in: patch.is_logged_in.unwrap_or(self.is_logged_in),
            favorites: patch.favorites.unwrap_or(self.favorites),
            preferences: patch.preferences.unwrap_or(self.preferences),
            saved_routes: patch.saved_routes.unwrap_or(self.saved_routes),
            recently_viewed: patch.recently_viewed.unwrap_or(self.recently_viewed),
            explore_controls: patch.explore_controls.unwrap_or(self.explore_controls),
        }
    }
}

// ---------------------------------------------------------------------------
// Field normalization
// ---------------------------------------------------------------------------

/// JavaScript `Boolean(value)` semantics.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn array_items(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn normalize_favorites(value: Option<&Value>) -> Vec<ArtworkId> {
    let mut seen = HashSet::new();
    array_items(value)
        .iter()
        .filter_map(Value::as_u64)
        .map(ArtworkId)
        .filter(|id| seen.insert(*id))
        .collect()
}

fn normalize_preferences(value: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    array_items(value)
        .iter()
        .filter_map(Value::as_str)
        .filter(|pref| seen.insert(*pref))
        .map(str::to_owned)
        .collect()
}

fn normalize_saved_routes(value: Option<&Value>) -> Vec<SavedRoute> {
    let mut seen = HashSet::new();
    array_items(value)
        .iter()
        .filter_map(|item| SavedRoute::deserialize(item).ok())
        .filter(|route| !route.id.is_empty() && seen.insert(route.id.clone()))
        .collect()
}

fn normalize_recently_viewed(value: Option<&Value>) -> Vec<RecentlyViewedItem> {
    let mut seen = HashSet::new();
    array_items(value)
        .iter()
        .filter_map(|item| RecentlyViewedItem::deserialize(item).ok())
        .filter(|item| seen.insert(item.id))
        .take(RECENTLY_VIEWED_CAP)
        .collect()
}

/// Normalize a stored `exploreControls` object.
///
/// Each field falls back independently: a non-string query becomes empty,
/// a department that is neither `"all"` nor a numeric string becomes
/// `all`, an unknown sort becomes `relevance`, and any view mode other
/// than `"list"` becomes `bento`.
pub fn normalize_explore_controls(value: Option<&Value>) -> ExploreControls {
    let Some(fields) = value.and_then(Value::as_object) else {
        return ExploreControls::default();
    };
    let text = |key: &str| fields.get(key).and_then(Value::as_str);

    ExploreControls {
        query: text("query").unwrap_or_default().to_owned(),
        department_id: text("departmentId")
            .and_then(|s| DepartmentFilter::from_str(s).ok())
            .unwrap_or_default(),
        sort_by: text("sortBy")
            .and_then(|s| SortBy::from_str(s).ok())
            .unwrap_or_default(),
        view_mode: if text("viewMode") == Some("list") {
            ViewMode::List
        } else {
            ViewMode::Bento
        },
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Reads and writes [`PersistedState`] under [`STORAGE_KEY`].
#[derive(Clone)]
pub struct PersistedStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl std::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedStore")
            .field("key", &STORAGE_KEY)
            .finish_non_exhaustive()
    }
}

impl PersistedStore {
    /// Wrap a storage backend.
    pub const fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// The underlying storage backend.
    pub const fn storage(&self) -> &Arc<dyn KeyValueStorage> {
        &self.storage
    }

    /// Read and normalize the stored state. Never fails.
    ///
    /// A storage backend error is logged and treated like an empty slot.
    pub fn read_persisted_state(&self) -> PersistedState {
        match self.storage.get(STORAGE_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => PersistedState::from_json(&raw),
            Ok(_) => PersistedState::default(),
            Err(e) => {
                warn!(error = %e, "failed to read persisted state, using defaults");
                PersistedState::default()
            }
        }
    }

    /// Merge `patch` onto the currently stored state and write the result.
    ///
    /// Explore controls pass through normalization on the read side and are
    /// typed on the patch side, so the written blob is always normalized.
    pub fn write_persisted_state(&self, patch: PersistedStatePatch) -> Result<(), StorageError> {
        let next = self.read_persisted_state().merged(patch);
        let raw = serde_json::to_string(&next)?;
        self.storage.set(STORAGE_KEY, &raw)?;
        debug!(
            favorites = next.favorites.len(),
            saved_routes = next.saved_routes.len(),
            recently_viewed = next.recently_viewed.len(),
            "persisted state written"
        );
        Ok(())
    }

    /// Remove the stored blob entirely.
    pub fn clear_persisted_state(&self) -> Result<(), StorageError> {
        self.storage.remove(STORAGE_KEY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use explor_types::{DepartmentId, RouteId};
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn store_with(raw: &str) -> (PersistedStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::with_entry(STORAGE_KEY, raw));
        (PersistedStore::new(storage.clone()), storage)
    }

    fn stored_json(storage: &MemoryStorage) -> Value {
        serde_json::from_str(&storage.get(STORAGE_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn not_json_yields_defaults() {
        let (store, _) = store_with("not json");
        assert_eq!(store.read_persisted_state(), PersistedState::default());
    }

    #[test]
    fn non_object_yields_defaults() {
        for raw in ["[]", "42", "\"hello\"", "null", "true"] {
            let (store, _) = store_with(raw);
            assert_eq!(store.read_persisted_state(), PersistedState::default(), "{raw}");
        }
    }

    #[test]
    fn missing_blob_yields_defaults() {
        let store = PersistedStore::new(Arc::new(MemoryStorage::new()));
        let state = store.read_persisted_state();
        assert!(!state.is_logged_in);
        assert!(state.favorites.is_empty());
        assert_eq!(state.explore_controls, ExploreControls::default());
    }

    #[test]
    fn wrong_typed_fields_degrade_independently() {
        let raw = json!({
            "isLoggedIn": "yes",
            "favorites": "not-an-array",
            "preferences": ["Impressionism", 3, "Impressionism", "Arms"],
            "savedRoutes": [{"id": "r1", "name": "Highlights"}, {"name": "no id"}, 7],
            "recentlyViewed": {"id": 1},
            "exploreControls": {
                "query": 12,
                "departmentId": "11",
                "sortBy": "popularity",
                "viewMode": "grid"
            }
        });
        let state = PersistedState::from_json(&raw.to_string());

        assert!(state.is_logged_in);
        assert!(state.favorites.is_empty());
        assert_eq!(state.preferences, vec!["Impressionism", "Arms"]);
        assert_eq!(state.saved_routes.len(), 1);
        assert_eq!(
            state.saved_routes.first().map(|r| r.id.clone()),
            Some(RouteId::new("r1"))
        );
        assert!(state.recently_viewed.is_empty());
        assert_eq!(
            state.explore_controls,
            ExploreControls {
                query: String::new(),
                department_id: DepartmentFilter::Department(DepartmentId(11)),
                sort_by: SortBy::Relevance,
                view_mode: ViewMode::Bento,
            }
        );
    }

    #[test]
    fn logged_in_follows_truthiness() {
        let cases = [
            (json!(true), true),
            (json!(1), true),
            (json!("x"), true),
            (json!({}), true),
            (json!(false), false),
            (json!(0), false),
            (json!(""), false),
            (json!(null), false),
        ];
        for (value, expected) in cases {
            let raw = json!({ "isLoggedIn": value }).to_string();
            assert_eq!(PersistedState::from_json(&raw).is_logged_in, expected, "{raw}");
        }
    }

    #[test]
    fn favorites_drop_non_ids_and_duplicates() {
        let raw = json!({ "favorites": [5, "6", 5, -1, 9, null] }).to_string();
        let state = PersistedState::from_json(&raw);
        assert_eq!(state.favorites, vec![ArtworkId(5), ArtworkId(9)]);
    }

    #[test]
    fn explore_controls_non_object_is_default() {
        assert_eq!(
            normalize_explore_controls(Some(&json!("bento"))),
            ExploreControls::default()
        );
        assert_eq!(normalize_explore_controls(None), ExploreControls::default());
    }

    #[test]
    fn write_patch_keeps_other_fields() {
        let (store, _) = store_with(
            &json!({
                "isLoggedIn": true,
                "preferences": ["Arms"],
                "exploreControls": {"query": "armor", "viewMode": "list"}
            })
            .to_string(),
        );
        let before = store.read_persisted_state();

        store
            .write_persisted_state(PersistedStatePatch {
                favorites: Some(vec![ArtworkId(5)]),
                ..PersistedStatePatch::default()
            })
            .unwrap();

        let after = store.read_persisted_state();
        assert_eq!(after.favorites, vec![ArtworkId(5)]);
        assert_eq!(
            after,
            PersistedState {
                favorites: vec![ArtworkId(5)],
                ..before
            }
        );
    }

    #[test]
    fn write_keeps_preference_flag_on_stored_routes() {
        let (store, storage) = store_with(
            &json!({
                "savedRoutes": [
                    {"id": "route-pref", "name": "Armor and Paintings", "generatedFromPreferences": true},
                    {"id": "route-plain", "name": "Highlights"}
                ]
            })
            .to_string(),
        );

        store
            .write_persisted_state(PersistedStatePatch {
                favorites: Some(vec![ArtworkId(5)]),
                ..PersistedStatePatch::default()
            })
            .unwrap();

        let stored = stored_json(&storage);
        assert_eq!(
            stored.pointer("/savedRoutes/0/generatedFromPreferences"),
            Some(&json!(true))
        );
        assert_eq!(
            stored.pointer("/savedRoutes/1/generatedFromPreferences"),
            Some(&json!(false))
        );
        let flags: Vec<bool> = store
            .read_persisted_state()
            .saved_routes
            .iter()
            .map(|route| route.generated_from_preferences)
            .collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn write_renormalizes_stored_explore_controls() {
        let (store, storage) = store_with(
            &json!({ "exploreControls": {"sortBy": 4, "viewMode": "list", "extra": true} })
                .to_string(),
        );
        store
            .write_persisted_state(PersistedStatePatch {
                is_logged_in: Some(true),
                ..PersistedStatePatch::default()
            })
            .unwrap();

        let written = stored_json(&storage);
        assert_eq!(
            written.get("exploreControls"),
            Some(&json!({
                "query": "",
                "departmentId": "all",
                "sortBy": "relevance",
                "viewMode": "list"
            }))
        );
    }

    #[test]
    fn clear_removes_blob() {
        let (store, storage) = store_with("{}");
        store.clear_persisted_state().unwrap();
        assert!(storage.is_empty());
        assert_eq!(store.read_persisted_state(), PersistedState::default());
    }
}

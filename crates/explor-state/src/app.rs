//! The application state container.
//!
//! [`AppState`] is the single authoritative in-memory state for a UI
//! session. It is a cheap-to-clone handle: every clone sees the same state,
//! the same persisted store and the same change broadcast. Mutations are
//! synchronous and never suspend; changes to persisted fields are written
//! through to the [`PersistedStore`] before the mutation returns.
//!
//! Observers subscribe to [`StateEvent`]s. A mutation that changes nothing
//! emits nothing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use explor_types::{
    Artwork, ArtworkId, ExploreControls, ExploreControlsPatch, RECENTLY_VIEWED_CAP,
    RecentlyViewedItem, RouteId, SavedRoute, Screen, ScreenStatus, Tab, Theme, TicketSession,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::persist::{PersistedState, PersistedStatePatch, PersistedStore};
use crate::storage::KeyValueStorage;
use crate::theme::{ThemeSink, read_theme_preference, write_theme_preference};

/// How long a toast stays visible before clearing itself.
pub const TOAST_DURATION: Duration = Duration::from_millis(2500);

/// Capacity of the change broadcast.
///
/// A subscriber that falls further behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips ahead.
const EVENT_CAPACITY: usize = 128;

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// Bottom-navigation tab changed.
    ActiveTabChanged(Tab),
    /// Sign-in flag changed.
    LoginChanged(bool),
    /// Favorites list changed.
    FavoritesChanged,
    /// Preferences list changed.
    PreferencesChanged,
    /// Saved routes changed.
    SavedRoutesChanged,
    /// Recently-viewed list changed.
    RecentlyViewedChanged,
    /// Explore controls changed.
    ExploreControlsChanged(ExploreControls),
    /// Artwork detail opened (`Some`) or closed (`None`).
    SelectedArtworkChanged(Option<ArtworkId>),
    /// Ticket checkout sheet opened or closed.
    TicketCheckoutChanged,
    /// Route preview opened or closed.
    SelectedRouteChanged,
    /// Map focus department changed.
    MapFocusChanged(Option<String>),
    /// Toast shown (`Some`) or cleared (`None`).
    ToastChanged(Option<String>),
    /// A screen moved to a new status.
    ScreenStatusChanged {
        /// The screen.
        screen: Screen,
        /// Its new status.
        status: ScreenStatus,
    },
    /// Colour theme changed.
    ThemeChanged(Theme),
}

/// Point-in-time copy of the whole UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSnapshot {
    /// Bottom-navigation tab.
    pub active_tab: Tab,
    /// Fields mirrored to the persisted store.
    pub persisted: PersistedState,
    /// Artwork shown in the detail view.
    pub selected_artwork: Option<Artwork>,
    /// Open ticket checkout sheet.
    pub ticket_checkout: Option<TicketSession>,
    /// Open route preview.
    pub selected_route: Option<SavedRoute>,
    /// Department name the map screen should focus.
    pub map_focus_department: Option<String>,
    /// Transient message.
    pub toast: Option<String>,
    /// Per-screen status; screens never set read as idle.
    pub screen_status: BTreeMap<Screen, ScreenStatus>,
    /// Dark palette active.
    pub dark_mode: bool,
}

impl UiSnapshot {
    /// Status of `screen`, idle if never set.
    pub fn screen_status(&self, screen: Screen) -> ScreenStatus {
        self.screen_status.get(&screen).copied().unwrap_or_default()
    }
}

/// Construction options for [`AppState`].
#[derive(Default)]
pub struct AppStateOptions {
    /// OS-level colour-scheme preference, used when no theme is stored.
    pub prefers_dark: bool,
    /// Receiver for theme changes.
    pub theme_sink: Option<Arc<dyn ThemeSink>>,
}

struct Inner {
    ui: Mutex<UiSnapshot>,
    toast_timer: Mutex<ToastTimer>,
    store: PersistedStore,
    theme_sink: Option<Arc<dyn ThemeSink>>,
    events: broadcast::Sender<StateEvent>,
}

#[derive(Default)]
struct ToastTimer {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Shared handle to the session state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ui", &*self.ui())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Load persisted state from `storage` and resolve the initial theme.
    ///
    /// The stored theme preference wins over `options.prefers_dark`. The
    /// resolved theme is written back to storage and pushed to the sink
    /// immediately, so the UI never renders with a stale palette.
    pub fn new(storage: Arc<dyn KeyValueStorage>, options: AppStateOptions) -> Self {
        let store = PersistedStore::new(Arc::clone(&storage));
        let persisted = store.read_persisted_state();
        let dark_mode = read_theme_preference(storage.as_ref())
            .map_or(options.prefers_dark, Theme::is_dark);

        debug!(
            logged_in = persisted.is_logged_in,
            favorites = persisted.favorites.len(),
            saved_routes = persisted.saved_routes.len(),
            dark_mode,
            "application state loaded"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = Self {
            inner: Arc::new(Inner {
                ui: Mutex::new(UiSnapshot {
                    active_tab: Tab::default(),
                    persisted,
                    selected_artwork: None,
                    ticket_checkout: None,
                    selected_route: None,
                    map_focus_department: None,
                    toast: None,
                    screen_status: BTreeMap::new(),
                    dark_mode,
                }),
                toast_timer: Mutex::new(ToastTimer::default()),
                store,
                theme_sink: options.theme_sink,
                events,
            }),
        };
        state.apply_theme(Theme::from_dark_mode(dark_mode));
        state
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.events.subscribe()
    }

    /// Copy of the full current state.
    pub fn snapshot(&self) -> UiSnapshot {
        self.ui().clone()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current bottom-navigation tab.
    pub fn active_tab(&self) -> Tab {
        self.ui().active_tab
    }

    /// Whether the user is signed in.
    pub fn is_logged_in(&self) -> bool {
        self.ui().persisted.is_logged_in
    }

    /// Favorited artwork ids in insertion order.
    pub fn favorites(&self) -> Vec<ArtworkId> {
        self.ui().persisted.favorites.clone()
    }

    /// Whether `id` is a favorite.
    pub fn is_favorite(&self, id: ArtworkId) -> bool {
        self.ui().persisted.favorites.contains(&id)
    }

    /// Chosen preference tags in insertion order.
    pub fn preferences(&self) -> Vec<String> {
        self.ui().persisted.preferences.clone()
    }

    /// Saved routes, most recent first.
    pub fn saved_routes(&self) -> Vec<SavedRoute> {
        self.ui().persisted.saved_routes.clone()
    }

    /// Recently viewed artworks, most recent first.
    pub fn recently_viewed(&self) -> Vec<RecentlyViewedItem> {
        self.ui().persisted.recently_viewed.clone()
    }

    /// Current explore controls.
    pub fn explore_controls(&self) -> ExploreControls {
        self.ui().persisted.explore_controls.clone()
    }

    /// Artwork in the detail view.
    pub fn selected_artwork(&self) -> Option<Artwork> {
        self.ui().selected_artwork.clone()
    }

    /// Current toast message.
    pub fn toast(&self) -> Option<String> {
        self.ui().toast.clone()
    }

    /// Status of `screen`.
    pub fn screen_status(&self, screen: Screen) -> ScreenStatus {
        self.ui().screen_status(screen)
    }

    /// Whether the dark palette is active.
    pub fn dark_mode(&self) -> bool {
        self.ui().dark_mode
    }

    // -----------------------------------------------------------------------
    // Session-only mutations
    // -----------------------------------------------------------------------

    /// Switch the bottom-navigation tab.
    pub fn set_active_tab(&self, tab: Tab) {
        let changed = {
            let mut ui = self.ui();
            std::mem::replace(&mut ui.active_tab, tab) != tab
        };
        if changed {
            self.emit(StateEvent::ActiveTabChanged(tab));
        }
    }

    /// Open the detail view for `artwork`, or close it with `None`.
    ///
    /// Opening always records the artwork as recently viewed, moving it to
    /// the front if it is already listed.
    pub fn set_selected_artwork(&self, artwork: Option<Artwork>) {
        let id = artwork.as_ref().map(|a| a.id);
        {
            let mut ui = self.ui();
            if let Some(artwork) = &artwork {
                let recent = &mut ui.persisted.recently_viewed;
                recent.retain(|item| item.id != artwork.id);
                recent.insert(0, RecentlyViewedItem::from(artwork));
                recent.truncate(RECENTLY_VIEWED_CAP);
                self.write_through(&ui.persisted);
            }
            ui.selected_artwork = artwork;
        }
        if id.is_some() {
            self.emit(StateEvent::RecentlyViewedChanged);
        }
        self.emit(StateEvent::SelectedArtworkChanged(id));
    }

    /// Open or close the ticket checkout sheet.
    pub fn set_ticket_checkout(&self, session: Option<TicketSession>) {
        self.ui().ticket_checkout = session;
        self.emit(StateEvent::TicketCheckoutChanged);
    }

    /// Open or close the route preview.
    pub fn set_selected_route(&self, route: Option<SavedRoute>) {
        self.ui().selected_route = route;
        self.emit(StateEvent::SelectedRouteChanged);
    }

    /// Ask the map screen to focus a department by name. Blank clears it.
    pub fn set_map_focus_department(&self, name: Option<String>) {
        let name = name.filter(|n| !n.trim().is_empty());
        let changed = {
            let mut ui = self.ui();
            if ui.map_focus_department == name {
                false
            } else {
                ui.map_focus_department.clone_from(&name);
                true
            }
        };
        if changed {
            self.emit(StateEvent::MapFocusChanged(name));
        }
    }

    /// Move `screen` to `status`.
    ///
    /// Returns `false` and notifies nobody when the status is unchanged.
    pub fn set_screen_status(&self, screen: Screen, status: ScreenStatus) -> bool {
        {
            let mut ui = self.ui();
            if ui.screen_status(screen) == status {
                return false;
            }
            ui.screen_status.insert(screen, status);
        }
        debug!(%screen, %status, "screen status changed");
        self.emit(StateEvent::ScreenStatusChanged { screen, status });
        true
    }

    // -----------------------------------------------------------------------
    // Persisted mutations
    // -----------------------------------------------------------------------

    /// Mark the user as signed in.
    ///
    /// Favorites, preferences and saved routes gathered before signing in
    /// are kept.
    pub fn login(&self) {
        if self.update_persisted(|p| !std::mem::replace(&mut p.is_logged_in, true)) {
            self.emit(StateEvent::LoginChanged(true));
        }
    }

    /// Sign out, clearing favorites, preferences and saved routes.
    ///
    /// Recently viewed items and explore controls belong to the device and
    /// survive.
    pub fn logout(&self) {
        let mut events = Vec::new();
        self.update_persisted(|p| {
            if std::mem::replace(&mut p.is_logged_in, false) {
                events.push(StateEvent::LoginChanged(false));
            }
            if !std::mem::take(&mut p.favorites).is_empty() {
                events.push(StateEvent::FavoritesChanged);
            }
            if !std::mem::take(&mut p.preferences).is_empty() {
                events.push(StateEvent::PreferencesChanged);
            }
            if !std::mem::take(&mut p.saved_routes).is_empty() {
                events.push(StateEvent::SavedRoutesChanged);
            }
            true
        });
        for event in events {
            self.emit(event);
        }
    }

    /// Add `id` to favorites, or remove it if present.
    ///
    /// Returns whether `id` is a favorite afterwards. Sign-in gating is the
    /// caller's policy.
    pub fn toggle_favorite(&self, id: ArtworkId) -> bool {
        let mut now_favorite = false;
        self.update_persisted(|p| {
            now_favorite = toggle(&mut p.favorites, id);
            true
        });
        self.emit(StateEvent::FavoritesChanged);
        now_favorite
    }

    /// Add `preference` to preferences, or remove it if present.
    ///
    /// Returns whether it is selected afterwards.
    pub fn toggle_preference(&self, preference: &str) -> bool {
        let mut now_selected = false;
        self.update_persisted(|p| {
            now_selected = toggle(&mut p.preferences, preference.to_owned());
            true
        });
        self.emit(StateEvent::PreferencesChanged);
        now_selected
    }

    /// Save `route` at the front of the saved list, replacing any route
    /// with the same id. Routes without an id are ignored.
    pub fn save_route(&self, route: SavedRoute) {
        if route.id.is_empty() {
            debug!("ignoring route without an id");
            return;
        }
        self.update_persisted(|p| {
            p.saved_routes.retain(|r| r.id != route.id);
            p.saved_routes.insert(0, route);
            true
        });
        self.emit(StateEvent::SavedRoutesChanged);
    }

    /// Remove the saved route with `id`, if any.
    pub fn clear_saved_route(&self, id: &RouteId) {
        let removed = self.update_persisted(|p| {
            let before = p.saved_routes.len();
            p.saved_routes.retain(|r| &r.id != id);
            p.saved_routes.len() != before
        });
        if removed {
            self.emit(StateEvent::SavedRoutesChanged);
        }
    }

    /// Shallow-merge `patch` into the explore controls.
    pub fn set_explore_controls(&self, patch: ExploreControlsPatch) {
        let mut merged = None;
        self.update_persisted(|p| {
            let next = p.explore_controls.merged(patch);
            if next == p.explore_controls {
                return false;
            }
            p.explore_controls = next.clone();
            merged = Some(next);
            true
        });
        if let Some(controls) = merged {
            self.emit(StateEvent::ExploreControlsChanged(controls));
        }
    }

    // -----------------------------------------------------------------------
    // Theme
    // -----------------------------------------------------------------------

    /// Turn the dark palette on or off.
    pub fn set_dark_mode(&self, dark: bool) {
        let changed = {
            let mut ui = self.ui();
            std::mem::replace(&mut ui.dark_mode, dark) != dark
        };
        if changed {
            self.apply_theme(Theme::from_dark_mode(dark));
        }
    }

    /// Flip the palette. Returns the new dark-mode flag.
    pub fn toggle_dark_mode(&self) -> bool {
        let dark = {
            let mut ui = self.ui();
            ui.dark_mode = !ui.dark_mode;
            ui.dark_mode
        };
        self.apply_theme(Theme::from_dark_mode(dark));
        dark
    }

    fn apply_theme(&self, theme: Theme) {
        if let Err(e) = write_theme_preference(self.inner.store.storage().as_ref(), theme) {
            warn!(error = %e, %theme, "failed to store theme preference");
        }
        if let Some(sink) = &self.inner.theme_sink {
            sink.apply(theme);
        }
        self.emit(StateEvent::ThemeChanged(theme));
    }

    // -----------------------------------------------------------------------
    // Toast
    // -----------------------------------------------------------------------

    /// Show `message` and clear it after [`TOAST_DURATION`].
    ///
    /// A newer toast cancels the pending clear of the one it replaces, so
    /// each message gets its full display time. Outside a Tokio runtime
    /// the toast stays until [`AppState::clear_toast`] is called.
    pub fn show_toast(&self, message: impl Into<String>) {
        let message = message.into();
        {
            let mut timer = self.toast_timer();
            timer.generation = timer.generation.wrapping_add(1);
            if let Some(previous) = timer.task.take() {
                previous.abort();
            }
            self.ui().toast = Some(message.clone());

            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let generation = timer.generation;
                let weak = Arc::downgrade(&self.inner);
                timer.task = Some(runtime.spawn(async move {
                    tokio::time::sleep(TOAST_DURATION).await;
                    clear_toast_if_current(&weak, generation);
                }));
            } else {
                debug!("no runtime, toast will not auto-clear");
            }
        }
        self.emit(StateEvent::ToastChanged(Some(message)));
    }

    /// Clear the toast now.
    pub fn clear_toast(&self) {
        let had_toast = self.ui().toast.take().is_some();
        if had_toast {
            self.emit(StateEvent::ToastChanged(None));
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ui(&self) -> MutexGuard<'_, UiSnapshot> {
        self.inner.ui.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn toast_timer(&self) -> MutexGuard<'_, ToastTimer> {
        self.inner
            .toast_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the persisted fields and write through if it reports a
    /// change. Returns what `f` returned.
    ///
    /// The write happens under the state lock so stored blobs follow the
    /// same order as in-memory mutations.
    fn update_persisted<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut PersistedState) -> bool,
    {
        let mut ui = self.ui();
        let changed = f(&mut ui.persisted);
        if changed {
            // Blocking storage I/O under the lock; see `KeyValueStorage`.
            self.write_through(&ui.persisted);
        }
        changed
    }

    fn write_through(&self, persisted: &PersistedState) {
        let patch = PersistedStatePatch::from(persisted.clone());
        if let Err(e) = self.inner.store.write_persisted_state(patch) {
            warn!(error = %e, "failed to persist application state");
        }
    }

    fn emit(&self, event: StateEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

fn clear_toast_if_current(inner: &Weak<Inner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let state = AppState { inner };
    let had_toast = {
        // Held across the clear so a concurrent `show_toast` cannot slip in
        // between the generation check and the write.
        let timer = state.toast_timer();
        timer.generation == generation && state.ui().toast.take().is_some()
    };
    if had_toast {
        state.emit(StateEvent::ToastChanged(None));
    }
}

/// Remove `item` if present, else append it. Returns whether it is present
/// afterwards.
fn toggle<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if let Some(pos) = items.iter().position(|existing| *existing == item) {
        items.remove(pos);
        false
    } else {
        items.push(item);
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStorage::new()), AppStateOptions::default())
    }

    #[test]
    fn toggle_helper_appends_then_removes() {
        let mut items = vec![1, 2];
        assert!(toggle(&mut items, 3));
        assert_eq!(items, vec![1, 2, 3]);
        assert!(!toggle(&mut items, 2));
        assert_eq!(items, vec![1, 3]);
    }

    #[test]
    fn defaults_are_idle_home_and_light() {
        let state = state();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.active_tab, Tab::Home);
        assert_eq!(snapshot.screen_status(Screen::Explore), ScreenStatus::Idle);
        assert!(!snapshot.dark_mode);
        assert!(snapshot.toast.is_none());
    }

    #[test]
    fn screen_status_unchanged_emits_nothing() {
        let state = state();
        let mut rx = state.subscribe();

        assert!(state.set_screen_status(Screen::Explore, ScreenStatus::Loading));
        assert!(!state.set_screen_status(Screen::Explore, ScreenStatus::Loading));
        assert!(!state.set_screen_status(Screen::Map, ScreenStatus::Idle));

        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::ScreenStatusChanged {
                screen: Screen::Explore,
                status: ScreenStatus::Loading,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn map_focus_blank_clears() {
        let state = state();
        state.set_map_focus_department(Some(String::from("Arms and Armor")));
        assert_eq!(
            state.snapshot().map_focus_department.as_deref(),
            Some("Arms and Armor")
        );
        state.set_map_focus_department(Some(String::from("  ")));
        assert_eq!(state.snapshot().map_focus_department, None);
    }

    #[test]
    fn toast_without_runtime_stays_until_cleared() {
        let state = state();
        state.show_toast("Saved");
        assert_eq!(state.toast().as_deref(), Some("Saved"));
        state.clear_toast();
        assert_eq!(state.toast(), None);
    }
}

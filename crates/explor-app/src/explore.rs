//! Explore screen orchestration.
//!
//! [`ExploreSession`] turns explore-control changes into collection
//! searches the way the explore screen does:
//!
//! - query text settles for [`SEARCH_DEBOUNCE`] before it is searched
//! - results grow a page of [`PAGE_SIZE`] at a time through
//!   [`ExploreSession::load_more`]; a new query or department starts over
//! - at most one search is current; starting another cancels its token,
//!   and a cancelled search changes nothing
//! - the explore screen status follows every search through the
//!   [`AppState`]
//!
//! Searches run on spawned tasks, so every trigger must be called from
//! inside a Tokio runtime. Results are published on a
//! [`watch`] channel.

use std::cmp::Reverse;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use explor_collection::{
    ArtworkPage, ArtworkSearch, CancellationToken, CollectionClient, CollectionError,
};
use explor_state::AppState;
use explor_types::{
    Artwork, ArtworkId, Department, DepartmentFilter, ExploreControlsPatch, Screen, ScreenStatus,
    SortBy, ViewMode,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long query text must stay unchanged before it is searched.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(320);

/// Results requested per page.
pub const PAGE_SIZE: usize = 24;

/// Error text shown when a search fails.
pub const LOAD_ERROR_MESSAGE: &str = "Unable to load artworks from The Met Collection API.";

/// What the explore screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreResults {
    /// Hydrated artworks in API order. Sorting is applied on read.
    pub artworks: Vec<Artwork>,
    /// Total matches reported by the API.
    pub total: u64,
    /// A search is in flight.
    pub is_loading: bool,
    /// User-facing error from the last search.
    pub error: Option<String>,
}

impl ExploreResults {
    /// Whether the API reports more matches than are loaded.
    pub fn can_load_more(&self) -> bool {
        u64::try_from(self.artworks.len()).is_ok_and(|loaded| loaded < self.total)
    }
}

/// One department filter chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentChip {
    /// Filter value the chip selects.
    pub filter: DepartmentFilter,
    /// Chip label.
    pub label: String,
}

struct SessionInner {
    debounced_query: String,
    limit: usize,
    departments: Vec<Department>,
    current: Option<CancellationToken>,
    debounce_task: Option<JoinHandle<()>>,
    search_task: Option<JoinHandle<()>>,
}

struct Shared {
    client: CollectionClient,
    state: AppState,
    inner: Mutex<SessionInner>,
    results: watch::Sender<ExploreResults>,
}

/// Explore screen controller. Clones share one session.
#[derive(Clone)]
pub struct ExploreSession {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ExploreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner();
        f.debug_struct("ExploreSession")
            .field("debounced_query", &inner.debounced_query)
            .field("limit", &inner.limit)
            .finish_non_exhaustive()
    }
}

impl ExploreSession {
    /// Create a session over the current explore controls of `state`.
    ///
    /// Nothing is searched until a trigger runs; call
    /// [`ExploreSession::reload`] to load the initial results.
    pub fn new(client: CollectionClient, state: AppState) -> Self {
        let debounced_query = state.explore_controls().query.trim().to_owned();
        let (results, _) = watch::channel(ExploreResults::default());
        Self {
            shared: Arc::new(Shared {
                client,
                state,
                inner: Mutex::new(SessionInner {
                    debounced_query,
                    limit: PAGE_SIZE,
                    departments: Vec::new(),
                    current: None,
                    debounce_task: None,
                    search_task: None,
                }),
                results,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Subscribe to result updates.
    pub fn subscribe(&self) -> watch::Receiver<ExploreResults> {
        self.shared.results.subscribe()
    }

    /// Current results in API order.
    pub fn results(&self) -> ExploreResults {
        self.shared.results.borrow().clone()
    }

    /// Current results in the order selected by the explore controls.
    pub fn sorted_artworks(&self) -> Vec<Artwork> {
        let sort_by = self.shared.state.explore_controls().sort_by;
        sort_artworks(&self.shared.results.borrow().artworks, sort_by)
    }

    /// Query text as last searched (trimmed).
    pub fn debounced_query(&self) -> String {
        self.inner().debounced_query.clone()
    }

    /// Current result limit.
    pub fn limit(&self) -> usize {
        self.inner().limit
    }

    /// `All` followed by one chip per loaded department.
    pub fn department_chips(&self) -> Vec<DepartmentChip> {
        let inner = self.inner();
        std::iter::once(DepartmentChip {
            filter: DepartmentFilter::All,
            label: String::from("All"),
        })
        .chain(inner.departments.iter().map(|d| DepartmentChip {
            filter: DepartmentFilter::Department(d.department_id),
            label: d.display_name.clone(),
        }))
        .collect()
    }

    // -----------------------------------------------------------------------
    // Triggers
    // -----------------------------------------------------------------------

    /// Load the department chips.
    ///
    /// A failure leaves the chip list at just `All`; a cancellation leaves
    /// it untouched.
    pub async fn load_departments(&self, token: &CancellationToken) {
        match self.shared.client.fetch_departments(token).await {
            Ok(departments) => {
                debug!(count = departments.len(), "explore departments loaded");
                self.inner().departments = departments;
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!(error = %e, "failed to load departments");
                self.inner().departments.clear();
            }
        }
    }

    /// Record typed query text and search it once it settles.
    ///
    /// Each call restarts the debounce window.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        let settled = text.trim().to_owned();
        self.shared
            .state
            .set_explore_controls(ExploreControlsPatch::query(text));

        let mut inner = self.inner();
        if let Some(pending) = inner.debounce_task.take() {
            pending.abort();
        }
        let session = self.clone();
        inner.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            session.apply_debounced_query(settled);
        }));
    }

    /// Select a department facet and search immediately.
    pub fn set_department(&self, department: DepartmentFilter) {
        let before = self.shared.state.explore_controls().department_id;
        if before == department {
            return;
        }
        self.shared
            .state
            .set_explore_controls(ExploreControlsPatch::department(department));
        self.inner().limit = PAGE_SIZE;
        self.start_search();
    }

    /// Change the client-side ordering. No request is made.
    pub fn set_sort(&self, sort_by: SortBy) {
        self.shared.state.set_explore_controls(ExploreControlsPatch {
            sort_by: Some(sort_by),
            ..ExploreControlsPatch::default()
        });
    }

    /// Change the grid layout. No request is made.
    pub fn set_view_mode(&self, view_mode: ViewMode) {
        self.shared.state.set_explore_controls(ExploreControlsPatch {
            view_mode: Some(view_mode),
            ..ExploreControlsPatch::default()
        });
    }

    /// Ask for one more page of results.
    pub fn load_more(&self) {
        {
            let mut inner = self.inner();
            inner.limit = inner.limit.saturating_add(PAGE_SIZE);
        }
        self.start_search();
    }

    /// Re-issue the current search.
    pub fn reload(&self) {
        self.start_search();
    }

    /// Favorite button on a result card.
    ///
    /// Guests get a sign-in prompt instead of a favorite. Returns whether
    /// the artwork is a favorite afterwards.
    pub fn favorite_clicked(&self, id: ArtworkId) -> bool {
        let state = &self.shared.state;
        if !state.is_logged_in() {
            state.show_toast("Sign in to save favorites");
            return false;
        }
        let now_favorite = state.toggle_favorite(id);
        state.show_toast(if now_favorite {
            "Added to favorites"
        } else {
            "Removed from favorites"
        });
        now_favorite
    }

    /// Open a result card in the detail view.
    pub fn open_artwork(&self, artwork: Artwork) {
        self.shared.state.set_selected_artwork(Some(artwork));
    }

    /// Wait until no debounce or search is pending.
    pub async fn settle(&self) {
        loop {
            let pending = {
                let mut inner = self.inner();
                inner
                    .debounce_task
                    .take()
                    .or_else(|| inner.search_task.take())
            };
            match pending {
                // An aborted debounce is expected here.
                Some(task) => {
                    let _ = task.await;
                }
                None => break,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_debounced_query(&self, settled: String) {
        {
            let mut inner = self.inner();
            if inner.debounced_query == settled {
                return;
            }
            inner.debounced_query = settled;
            inner.limit = PAGE_SIZE;
        }
        self.start_search();
    }

    /// Cancel whatever is in flight and start the search the current
    /// inputs describe.
    fn start_search(&self) {
        let department = self.shared.state.explore_controls().department_id;
        let mut inner = self.inner();
        if let Some(previous) = inner.current.take() {
            previous.cancel();
        }

        if inner.debounced_query.is_empty() && department == DepartmentFilter::All {
            debug!("explore has no query or department, skipping search");
            self.shared.results.send_replace(ExploreResults::default());
            self.shared
                .state
                .set_screen_status(Screen::Explore, ScreenStatus::Empty);
            return;
        }

        let search = ArtworkSearch {
            query: inner.debounced_query.clone(),
            department_id: department.department_id(),
            limit: inner.limit,
            is_highlight: false,
        };
        debug!(
            query = %search.query,
            department = %department,
            limit = search.limit,
            "explore search started"
        );

        self.shared.results.send_modify(|results| {
            results.is_loading = true;
            results.error = None;
        });
        self.shared
            .state
            .set_screen_status(Screen::Explore, ScreenStatus::Loading);

        let token = CancellationToken::new();
        inner.current = Some(token.clone());
        let session = self.clone();
        inner.search_task = Some(tokio::spawn(async move {
            session.run_search(search, token).await;
        }));
    }

    async fn run_search(&self, search: ArtworkSearch, token: CancellationToken) {
        let outcome = self.shared.client.search_artworks(&search, &token).await;

        // Checked under the lock that `start_search` cancels under, so a
        // superseded search can never publish.
        let _inner = self.inner();
        if token.is_cancelled() {
            return;
        }
        self.publish_outcome(&search.query, outcome);
    }

    /// Publish a finished search and set the explore screen status.
    ///
    /// Only called for the current search. A `Cancelled` error reaching
    /// here came from a borrowed shared request, not from this session, so
    /// it is reported like any other failure.
    fn publish_outcome(&self, query: &str, outcome: Result<ArtworkPage, CollectionError>) {
        let status = match outcome {
            Ok(page) => {
                info!(
                    query,
                    total = page.total,
                    loaded = page.artworks.len(),
                    "explore search finished"
                );
                let status = if page.artworks.is_empty() {
                    ScreenStatus::Empty
                } else {
                    ScreenStatus::Success
                };
                self.shared.results.send_replace(ExploreResults {
                    artworks: page.artworks,
                    total: page.total,
                    is_loading: false,
                    error: None,
                });
                status
            }
            Err(e) => {
                warn!(error = %e, query, "explore search failed");
                self.shared.results.send_replace(ExploreResults {
                    artworks: Vec::new(),
                    total: 0,
                    is_loading: false,
                    error: Some(LOAD_ERROR_MESSAGE.to_owned()),
                });
                ScreenStatus::Error
            }
        };
        self.shared.state.set_screen_status(Screen::Explore, status);
    }
}

/// Order `items` for display.
///
/// Title and artist sort ascending ignoring case; newest sorts the date
/// text descending; relevance keeps API order. Ties keep API order.
pub fn sort_artworks(items: &[Artwork], sort_by: SortBy) -> Vec<Artwork> {
    let mut sorted = items.to_vec();
    match sort_by {
        SortBy::Relevance => {}
        SortBy::Title => sorted.sort_by_cached_key(|a| a.title.to_lowercase()),
        SortBy::Artist => sorted.sort_by_cached_key(|a| a.artist.to_lowercase()),
        SortBy::Newest => sorted.sort_by_cached_key(|a| Reverse(a.date.to_lowercase())),
    }
    sorted
}

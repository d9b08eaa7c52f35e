//! Headless session driver for the Explor client.
//!
//! Runs one browse session against the collection API the way the app's
//! first screens do, reporting through `tracing` instead of a UI.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from environment variables
//! 3. Open device storage and restore the session state
//! 4. Load departments and the featured artworks (home screen)
//! 5. Run the initial explore search and log the sorted results
//!
//! Ctrl-C cancels whatever request is in flight.

use std::sync::Arc;

use anyhow::Context;
use explor_app::{AppConfig, ExploreSession, load_featured};
use explor_collection::{CancellationToken, CollectionCache, CollectionClient};
use explor_state::{AppState, AppStateOptions, FileStorage, ThemeSink};
use explor_types::{Screen, Theme};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Logs theme changes in place of a document attribute.
struct LogThemeSink;

impl ThemeSink for LogThemeSink {
    fn apply(&self, theme: Theme) {
        info!(%theme, "theme applied");
    }
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a required collection
/// request fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("explor starting");

    let config = AppConfig::from_env()?;
    info!(
        api_base_url = config.api_base_url,
        state_dir = %config.state_dir.display(),
        featured_limit = config.featured_limit,
        prefers_dark = config.prefers_dark,
        "configuration loaded"
    );

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight requests");
            on_interrupt.cancel();
        }
    });

    let client = CollectionClient::new(&config.api_base_url, Arc::new(CollectionCache::new()));
    let state = AppState::new(
        Arc::new(FileStorage::new(&config.state_dir)),
        AppStateOptions {
            prefers_dark: config.prefers_dark,
            theme_sink: Some(Arc::new(LogThemeSink)),
        },
    );
    let restored = state.snapshot();
    info!(
        logged_in = restored.persisted.is_logged_in,
        favorites = restored.persisted.favorites.len(),
        saved_routes = restored.persisted.saved_routes.len(),
        recently_viewed = restored.persisted.recently_viewed.len(),
        "session restored"
    );

    // Home screen
    let featured = load_featured(&client, &state, config.featured_limit, &token)
        .await
        .context("loading featured artworks")?;
    for artwork in &featured {
        info!(id = %artwork.id, title = artwork.title, artist = artwork.artist, "featured");
    }

    // Explore screen
    let explore = ExploreSession::new(client, state.clone());
    explore.load_departments(&token).await;
    info!(
        departments = explore.department_chips().len().saturating_sub(1),
        "department filters loaded"
    );

    match config.initial_query {
        Some(query) => explore.set_query(query),
        None => explore.reload(),
    }
    explore.settle().await;

    let results = explore.results();
    if let Some(error) = &results.error {
        warn!(error, "explore search failed");
    }
    info!(
        query = explore.debounced_query(),
        total = results.total,
        loaded = results.artworks.len(),
        status = %state.screen_status(Screen::Explore),
        "explore results"
    );
    for artwork in explore.sorted_artworks() {
        info!(id = %artwork.id, title = artwork.title, date = artwork.date, "result");
    }

    info!("explor session finished");
    Ok(())
}

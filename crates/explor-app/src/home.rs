//! Home screen loading.

use explor_collection::{CancellationToken, CollectionClient};
use explor_state::AppState;
use explor_types::{Artwork, Screen, ScreenStatus};
use tracing::{info, warn};

use crate::error::AppError;

/// Load the featured carousel and move the home screen status with it.
///
/// The status goes to `loading` first, then `success`, `empty`, or `error`.
///
/// # Errors
///
/// Returns [`AppError::Collection`] if the featured searches fail or are
/// cancelled.
pub async fn load_featured(
    client: &CollectionClient,
    state: &AppState,
    limit: usize,
    token: &CancellationToken,
) -> Result<Vec<Artwork>, AppError> {
    state.set_screen_status(Screen::Home, ScreenStatus::Loading);

    let featured = match client.fetch_featured_artworks(limit, token).await {
        Ok(featured) => featured,
        Err(e) => {
            warn!(error = %e, "featured artworks failed to load");
            state.set_screen_status(Screen::Home, ScreenStatus::Error);
            return Err(e.into());
        }
    };

    let status = if featured.is_empty() {
        ScreenStatus::Empty
    } else {
        ScreenStatus::Success
    };
    state.set_screen_status(Screen::Home, status);
    info!(count = featured.len(), %status, "featured artworks loaded");
    Ok(featured)
}

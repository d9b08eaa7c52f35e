//! HTTP client for the Met Collection API.
//!
//! Every operation takes a [`CancellationToken`]. Cancelling it makes the
//! operation return [`CollectionError::Cancelled`] at its next suspension
//! point, and the token is passed down into every nested request so a
//! superseded search never delivers a late result.

use std::collections::HashSet;
use std::sync::Arc;

use explor_types::{Artwork, ArtworkId, Department, DepartmentId};
use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::artwork::map_object;
use crate::cache::{CollectionCache, ObjectResult};
use crate::error::CollectionError;
use crate::query::SearchQuery;

/// Public Met Collection API base URL.
pub const DEFAULT_BASE_URL: &str = "https://collectionapi.metmuseum.org/public/collection/v1";

/// Number of object requests issued concurrently per hydration batch.
pub const REQUEST_BATCH_SIZE: usize = 12;

/// Default number of artworks returned by [`CollectionClient::search_artworks`].
pub const DEFAULT_SEARCH_LIMIT: usize = 24;

/// Default size of the featured carousel.
pub const DEFAULT_FEATURED_LIMIT: usize = 10;

/// Candidates hydrated per requested artwork, to absorb image-less objects.
const OVERFETCH_FACTOR: usize = 4;

/// Query used for the highlighted tier of the featured carousel.
const FEATURED_QUERY: &str = "masterpiece";

/// Query used to top up the featured carousel.
const FEATURED_FALLBACK_QUERY: &str = "painting";

/// Raw `/search` result: the remote total and the matching ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Total number of matches reported by the API.
    pub total: u64,
    /// Matching object ids in API order.
    pub object_ids: Vec<ArtworkId>,
}

/// Parameters of [`CollectionClient::search_artworks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkSearch {
    /// Free-text query; blank means the default query.
    pub query: String,
    /// Restrict to one department.
    pub department_id: Option<DepartmentId>,
    /// Maximum number of hydrated artworks to return.
    pub limit: usize,
    /// Only highlighted objects.
    pub is_highlight: bool,
}

impl Default for ArtworkSearch {
    fn default() -> Self {
        Self {
            query: String::new(),
            department_id: None,
            limit: DEFAULT_SEARCH_LIMIT,
            is_highlight: false,
        }
    }
}

/// Hydrated search page.
///
/// `total` is the remote count and is usually larger than
/// `artworks.len()`: only the first candidates are hydrated, and objects
/// without images are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtworkPage {
    /// Total number of matches reported by the API.
    pub total: u64,
    /// Hydrated artworks in API order.
    pub artworks: Vec<Artwork>,
}

/// Cached, cancellable client for the collection API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct CollectionClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    cache: Arc<CollectionCache>,
}

impl CollectionClient {
    /// Create a client for `base_url` backed by `cache`.
    pub fn new(base_url: &str, cache: Arc<CollectionCache>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, cache)
    }

    /// Create a client reusing an existing `reqwest` client.
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        cache: Arc<CollectionCache>,
    ) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            cache,
        }
    }

    /// The cache shared by this client.
    pub const fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    /// The API base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Departments
    // -----------------------------------------------------------------------

    /// Fetch the department list.
    ///
    /// The first successful call fills the cache; every later call returns
    /// the cached list without a request, whatever token it carries. A
    /// failure leaves the cache empty so the next call retries.
    pub async fn fetch_departments(
        &self,
        token: &CancellationToken,
    ) -> Result<Vec<Department>, CollectionError> {
        if let Some(cached) = self.cache.cached_departments() {
            debug!(count = cached.len(), "departments served from cache");
            return Ok(cached.to_vec());
        }

        let departments = self
            .cache
            .departments_or_try_init(|| async {
                let payload =
                    fetch_json(&self.http, &self.base_url, "/departments", &[], token).await?;
                let departments = parse_departments(&payload);
                debug!(count = departments.len(), "departments fetched");
                Ok(departments)
            })
            .await?;

        Ok(departments.to_vec())
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Run a `/search` request and return the reported total and ids.
    ///
    /// No local filtering: whatever the API reports is returned.
    pub async fn search_objects(
        &self,
        query: &SearchQuery,
        token: &CancellationToken,
    ) -> Result<SearchResults, CollectionError> {
        let pairs = query.to_query_pairs();
        let payload = fetch_json(&self.http, &self.base_url, "/search", &pairs, token).await?;

        let total = payload.get("total").and_then(Value::as_u64).unwrap_or(0);
        let object_ids: Vec<ArtworkId> = payload
            .get("objectIDs")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_u64).map(ArtworkId).collect())
            .unwrap_or_default();

        debug!(
            query = query.effective_query(),
            department_id = ?query.department_id,
            is_highlight = query.is_highlight,
            total,
            ids = object_ids.len(),
            "search completed"
        );

        Ok(SearchResults { total, object_ids })
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Fetch and map one object.
    ///
    /// Memoized per id for the life of the cache, including while the
    /// request is in flight. `Ok(None)` means the object exists but cannot
    /// be shown (no image). On failure the entry is evicted and every
    /// waiter receives the error.
    pub async fn fetch_object(
        &self,
        id: ArtworkId,
        token: &CancellationToken,
    ) -> ObjectResult {
        if id.into_inner() == 0 {
            return Ok(None);
        }
        if token.is_cancelled() {
            return Err(CollectionError::Cancelled);
        }

        let result = self.await_object(id, token).await;

        // The shared request runs under the token of whoever started it. If
        // that caller gave up but this one did not, the entry is already
        // evicted and a request under our own token can take its place.
        match result {
            Err(CollectionError::Cancelled) if !token.is_cancelled() => {
                debug!(object_id = %id, "shared request was cancelled by its owner, retrying");
                self.await_object(id, token).await
            }
            other => other,
        }
    }

    async fn await_object(&self, id: ArtworkId, token: &CancellationToken) -> ObjectResult {
        let (request, created) = self.cache.object_or_insert_with(id, || {
            let http = self.http.clone();
            let base_url = Arc::clone(&self.base_url);
            let cache = Arc::clone(&self.cache);
            let owner_token = token.clone();
            async move {
                let path = format!("/objects/{id}");
                let result = fetch_json(&http, &base_url, &path, &[], &owner_token)
                    .await
                    .map(|payload| map_object(&payload));
                if let Err(e) = &result {
                    cache.evict_object(id);
                    debug!(object_id = %id, error = %e, "object request failed, cache entry evicted");
                }
                result
            }
            .boxed()
            .shared()
        });

        if !created {
            debug!(object_id = %id, "object served from cache");
        }

        tokio::select! {
            biased;
            () = token.cancelled() => Err(CollectionError::Cancelled),
            result = request => result,
        }
    }

    /// Hydrate a list of ids into artworks.
    ///
    /// Duplicate ids are dropped (first occurrence wins). At most
    /// `max(limit * 4, limit)` candidates are considered, requested in
    /// sequential batches of [`REQUEST_BATCH_SIZE`]; no further batch starts
    /// once `limit` artworks are collected. A failed object is skipped, but
    /// a cancelled one aborts the whole call. The result keeps input order
    /// and holds at most `limit` artworks.
    ///
    /// `limit` of `None` hydrates every unique id; `Some(0)` is treated as 1.
    pub async fn fetch_objects_by_ids(
        &self,
        ids: &[ArtworkId],
        limit: Option<usize>,
        token: &CancellationToken,
    ) -> Result<Vec<Artwork>, CollectionError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<ArtworkId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let effective_limit = limit.map_or(unique.len(), |limit| limit.max(1));
        let candidate_cap = effective_limit
            .saturating_mul(OVERFETCH_FACTOR)
            .max(effective_limit);
        let candidates: Vec<ArtworkId> = unique.into_iter().take(candidate_cap).collect();

        let mut artworks: Vec<Artwork> = Vec::with_capacity(effective_limit.min(candidates.len()));

        for batch in candidates.chunks(REQUEST_BATCH_SIZE) {
            if artworks.len() >= effective_limit {
                break;
            }
            if token.is_cancelled() {
                return Err(CollectionError::Cancelled);
            }

            let responses = join_all(batch.iter().map(|id| self.fetch_object(*id, token))).await;

            for (id, response) in batch.iter().zip(responses) {
                match response {
                    Ok(Some(artwork)) => artworks.push(artwork),
                    Ok(None) => debug!(object_id = %id, "object has no image, skipped"),
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => warn!(object_id = %id, error = %e, "object hydration failed, skipped"),
                }
                if artworks.len() >= effective_limit {
                    break;
                }
            }
        }

        artworks.truncate(effective_limit);
        debug!(
            requested = ids.len(),
            candidates = candidates.len(),
            hydrated = artworks.len(),
            "objects hydrated"
        );
        Ok(artworks)
    }

    // -----------------------------------------------------------------------
    // Composite operations
    // -----------------------------------------------------------------------

    /// Search and hydrate up to `search.limit` artworks.
    ///
    /// Images are always required.
    pub async fn search_artworks(
        &self,
        search: &ArtworkSearch,
        token: &CancellationToken,
    ) -> Result<ArtworkPage, CollectionError> {
        let query = SearchQuery {
            query: search.query.clone(),
            department_id: search.department_id,
            has_images: true,
            is_highlight: search.is_highlight,
        };
        let results = self.search_objects(&query, token).await?;
        let artworks = self
            .fetch_objects_by_ids(&results.object_ids, Some(search.limit), token)
            .await?;

        Ok(ArtworkPage {
            total: results.total,
            artworks,
        })
    }

    /// Artworks for the featured carousel.
    ///
    /// Highlighted works come first. When there are fewer than `limit` of
    /// them, the list is topped up from a broader query of `limit * 2`
    /// candidates, skipping ids already present.
    pub async fn fetch_featured_artworks(
        &self,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Artwork>, CollectionError> {
        let highlights = self
            .search_artworks(
                &ArtworkSearch {
                    query: String::from(FEATURED_QUERY),
                    limit,
                    is_highlight: true,
                    ..ArtworkSearch::default()
                },
                token,
            )
            .await?;

        let mut merged = highlights.artworks;
        if merged.len() >= limit {
            merged.truncate(limit);
            return Ok(merged);
        }

        debug!(
            highlighted = merged.len(),
            limit, "featured highlights short, querying fallback"
        );

        let fallback = self
            .search_artworks(
                &ArtworkSearch {
                    query: String::from(FEATURED_FALLBACK_QUERY),
                    limit: limit.saturating_mul(2),
                    ..ArtworkSearch::default()
                },
                token,
            )
            .await?;

        let mut used: HashSet<ArtworkId> = merged.iter().map(|artwork| artwork.id).collect();
        for artwork in fallback.artworks {
            if merged.len() >= limit {
                break;
            }
            if used.insert(artwork.id) {
                merged.push(artwork);
            }
        }

        merged.truncate(limit);
        Ok(merged)
    }
}

impl core::fmt::Debug for CollectionClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollectionClient")
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// GET `{base_url}{path}` and decode the JSON body.
///
/// Any non-2xx status is an error; there is no retry. Cancellation wins
/// over a response that is ready at the same time.
async fn fetch_json(
    http: &reqwest::Client,
    base_url: &str,
    path: &str,
    query: &[(&'static str, String)],
    token: &CancellationToken,
) -> Result<Value, CollectionError> {
    if token.is_cancelled() {
        return Err(CollectionError::Cancelled);
    }

    let url = format!("{base_url}{path}");
    let request = async {
        let response = http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CollectionError::Transport(format!("GET {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectionError::Status {
                status: status.as_u16(),
                path: path.to_owned(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CollectionError::Decode(format!("GET {path}: {e}")))
    };

    tokio::select! {
        biased;
        () = token.cancelled() => Err(CollectionError::Cancelled),
        result = request => result,
    }
}

/// Read `departments` from a `/departments` payload, skipping malformed entries.
fn parse_departments(payload: &Value) -> Vec<Department> {
    payload
        .get("departments")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_departments_skips_malformed_entries() {
        let payload = json!({
            "departments": [
                {"departmentId": 1, "displayName": "American Decorative Arts"},
                {"departmentId": "x"},
                {"departmentId": 11, "displayName": "European Paintings"}
            ]
        });
        let departments = parse_departments(&payload);
        assert_eq!(departments.len(), 2);
        assert_eq!(
            departments.last().map(|d| d.department_id),
            Some(DepartmentId(11))
        );
    }

    #[test]
    fn parse_departments_tolerates_missing_list() {
        assert!(parse_departments(&json!({})).is_empty());
        assert!(parse_departments(&json!({"departments": null})).is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CollectionClient::new(
            "https://collection.example/v1/",
            Arc::new(CollectionCache::new()),
        );
        assert_eq!(client.base_url(), "https://collection.example/v1");
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_any_request() {
        // Unroutable address: if a request were attempted the call would
        // fail with a transport error instead.
        let client = CollectionClient::new("http://127.0.0.1:9", Arc::new(CollectionCache::new()));
        let token = CancellationToken::new();
        token.cancel();

        let result = client.fetch_object(ArtworkId(1), &token).await;
        assert_eq!(result, Err(CollectionError::Cancelled));
        assert_eq!(client.cache().cached_object_count(), 0);

        let hydrated = client
            .fetch_objects_by_ids(&[ArtworkId(1), ArtworkId(2)], Some(1), &token)
            .await;
        assert_eq!(hydrated, Err(CollectionError::Cancelled));
    }

    #[tokio::test]
    async fn empty_id_list_needs_no_request() {
        let client = CollectionClient::new("http://127.0.0.1:9", Arc::new(CollectionCache::new()));
        let token = CancellationToken::new();
        let result = client.fetch_objects_by_ids(&[], Some(5), &token).await;
        assert_eq!(result, Ok(Vec::new()));
        assert_eq!(client.fetch_object(ArtworkId(0), &token).await, Ok(None));
    }
}

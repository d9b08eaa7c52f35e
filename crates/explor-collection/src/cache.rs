//! Session-wide caches for departments and hydrated objects.
//!
//! A [`CollectionCache`] is created once at startup and handed to every
//! [`CollectionClient`](crate::CollectionClient) by `Arc`, so tests can use
//! a fresh cache each. Entries are only ever added; an object entry is
//! removed again when its request fails, so a later call can retry.
//!
//! Object entries hold the in-flight request itself (a [`Shared`] future),
//! not just its eventual result: every caller asking for the same id while
//! the first request is running awaits that one request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use explor_types::{Artwork, ArtworkId, Department};
use futures::future::{BoxFuture, Shared};
use tokio::sync::OnceCell;

use crate::error::CollectionError;

/// Outcome of hydrating one object id.
pub type ObjectResult = Result<Option<Artwork>, CollectionError>;

/// A cached, possibly still running, object request.
pub type SharedObjectRequest = Shared<BoxFuture<'static, ObjectResult>>;

/// Department list and per-object request cache.
#[derive(Default)]
pub struct CollectionCache {
    departments: OnceCell<Vec<Department>>,
    objects: Mutex<HashMap<ArtworkId, SharedObjectRequest>>,
}

impl CollectionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached department list, if a fetch has succeeded.
    pub fn cached_departments(&self) -> Option<&[Department]> {
        self.departments.get().map(Vec::as_slice)
    }

    /// Number of object ids with a cached or in-flight request.
    pub fn cached_object_count(&self) -> usize {
        self.lock_objects().len()
    }

    /// Whether `id` has a cached or in-flight request.
    pub fn contains_object(&self, id: ArtworkId) -> bool {
        self.lock_objects().contains_key(&id)
    }

    /// Return the cached department list, running `init` if there is none.
    ///
    /// Concurrent first callers share a single `init`. A failed `init` leaves
    /// the cache empty.
    pub(crate) async fn departments_or_try_init<F, Fut>(
        &self,
        init: F,
    ) -> Result<&[Department], CollectionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Department>, CollectionError>>,
    {
        self.departments
            .get_or_try_init(init)
            .await
            .map(Vec::as_slice)
    }

    /// Return the request cached for `id`, inserting the one built by `start`
    /// when there is none.
    ///
    /// The second element is `true` when `start` was called. Check and insert
    /// happen under one lock, so two callers can never both start a request
    /// for the same id.
    pub(crate) fn object_or_insert_with<F>(
        &self,
        id: ArtworkId,
        start: F,
    ) -> (SharedObjectRequest, bool)
    where
        F: FnOnce() -> SharedObjectRequest,
    {
        let mut objects = self.lock_objects();
        if let Some(existing) = objects.get(&id) {
            return (existing.clone(), false);
        }
        let request = start();
        objects.insert(id, request.clone());
        (request, true)
    }

    /// Drop the entry for `id` so the next lookup issues a fresh request.
    pub(crate) fn evict_object(&self, id: ArtworkId) {
        self.lock_objects().remove(&id);
    }

    fn lock_objects(&self) -> MutexGuard<'_, HashMap<ArtworkId, SharedObjectRequest>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollectionCache")
            .field("departments", &self.departments.get().map(Vec::len))
            .field("objects", &self.cached_object_count())
            .finish()
    }
}

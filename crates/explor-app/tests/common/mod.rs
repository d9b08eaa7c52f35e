//! Local collection API for explore session tests.
//!
//! Every object id resolves to a generated artwork. Search replies are keyed
//! by query text and department, and can be delayed to hold a search in
//! flight while a test supersedes it.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use explor_collection::{CollectionCache, CollectionClient};
use explor_state::{AppState, AppStateOptions, MemoryStorage};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone)]
struct SearchReply {
    body: Option<Value>,
    delay: Duration,
}

/// Fixture state behind the mock server.
#[derive(Default)]
pub struct MockApi {
    departments: Mutex<Vec<Value>>,
    searches: Mutex<HashMap<String, SearchReply>>,
    search_log: Mutex<Vec<HashMap<String, String>>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_department(&self, id: u64, name: &str) {
        self.departments
            .lock()
            .unwrap()
            .push(json!({ "departmentId": id, "displayName": name }));
    }

    /// Answer `q` (optionally restricted to `department`) with `ids`.
    pub fn set_search(&self, q: &str, department: Option<u64>, total: u64, ids: &[u64]) {
        self.set_search_reply(q, department, Some(json!({ "total": total, "objectIDs": ids })), Duration::ZERO);
    }

    /// Like [`MockApi::set_search`] but the reply is held back for `delay`.
    pub fn set_slow_search(&self, q: &str, department: Option<u64>, ids: &[u64], delay: Duration) {
        let total = ids.len() as u64;
        self.set_search_reply(q, department, Some(json!({ "total": total, "objectIDs": ids })), delay);
    }

    /// Answer `q` with a 500.
    pub fn fail_search(&self, q: &str, department: Option<u64>) {
        self.set_search_reply(q, department, None, Duration::ZERO);
    }

    fn set_search_reply(&self, q: &str, department: Option<u64>, body: Option<Value>, delay: Duration) {
        self.searches
            .lock()
            .unwrap()
            .insert(search_key(q, department), SearchReply { body, delay });
    }

    /// Every `/search` query string received, in order.
    pub fn search_log(&self) -> Vec<HashMap<String, String>> {
        self.search_log.lock().unwrap().clone()
    }

    /// The `q` of every search received, in order.
    pub fn searched_queries(&self) -> Vec<String> {
        self.search_log()
            .into_iter()
            .map(|params| params.get("q").cloned().unwrap_or_default())
            .collect()
    }

    pub async fn serve(self: &Arc<Self>) -> String {
        let router = Router::new()
            .route("/departments", get(departments))
            .route("/search", get(search))
            .route("/objects/{id}", get(object))
            .with_state(Arc::clone(self));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{addr}")
    }
}

fn search_key(q: &str, department: Option<u64>) -> String {
    format!("{q}|{}", department.map(|d| d.to_string()).unwrap_or_default())
}

async fn departments(State(api): State<Arc<MockApi>>) -> Response {
    let list = api.departments.lock().unwrap().clone();
    axum::Json(json!({ "departments": list })).into_response()
}

async fn search(
    State(api): State<Arc<MockApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    api.search_log.lock().unwrap().push(params.clone());

    let q = params.get("q").cloned().unwrap_or_default();
    let department = params.get("departmentId").and_then(|d| d.parse().ok());
    let reply = api
        .searches
        .lock()
        .unwrap()
        .get(&search_key(&q, department))
        .cloned();

    let Some(reply) = reply else {
        return axum::Json(json!({ "total": 0, "objectIDs": null })).into_response();
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    match reply.body {
        Some(body) => axum::Json(body).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn object(Path(id): Path<u64>) -> Response {
    axum::Json(json!({
        "objectID": id,
        "title": format!("Object {id}"),
        "artistDisplayName": format!("Artist {id}"),
        "objectDate": id.saturating_add(1800).to_string(),
        "department": "European Paintings",
        "primaryImageSmall": format!("https://images.example/{id}.jpg"),
        "objectURL": format!("https://collection.example/{id}")
    }))
    .into_response()
}

/// A client pointed at `api` with a fresh cache, and fresh in-memory state.
pub async fn session_parts(api: &Arc<MockApi>) -> (CollectionClient, AppState) {
    let base_url = api.serve().await;
    let client = CollectionClient::new(&base_url, Arc::new(CollectionCache::new()));
    let state = AppState::new(Arc::new(MemoryStorage::new()), AppStateOptions::default());
    (client, state)
}

//! In-process stand-in for the collection API.
//!
//! Serves `/departments`, `/search` and `/objects/{id}` from an Axum router
//! bound to an ephemeral localhost port, counting hits per path and logging
//! every search query so tests can assert on what was actually requested.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// What an endpoint answers with.
#[derive(Clone)]
pub enum MockReply {
    /// 200 with this body.
    Json(Value),
    /// Bare status code.
    Status(u16),
}

#[derive(Clone)]
struct MockObject {
    reply: MockReply,
    delay: Duration,
}

/// Mutable fixture state behind the mock server.
#[derive(Default)]
pub struct MockApi {
    departments: Mutex<Option<MockReply>>,
    searches: Mutex<HashMap<String, Value>>,
    objects: Mutex<HashMap<u64, MockObject>>,
    hits: Mutex<HashMap<String, usize>>,
    search_log: Mutex<Vec<HashMap<String, String>>>,
}

/// A minimal object payload with an image.
pub fn object_payload(id: u64) -> Value {
    json!({
        "objectID": id,
        "title": format!("Object {id}"),
        "artistDisplayName": format!("Artist {id}"),
        "objectDate": id.saturating_add(1800).to_string(),
        "department": "European Paintings",
        "primaryImageSmall": format!("https://images.example/{id}.jpg"),
        "classification": "Paintings",
        "objectURL": format!("https://collection.example/{id}")
    })
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_departments(&self, departments: Value) {
        *self.departments.lock().unwrap() = Some(MockReply::Json(json!({
            "departments": departments
        })));
    }

    pub fn fail_departments(&self, status: u16) {
        *self.departments.lock().unwrap() = Some(MockReply::Status(status));
    }

    /// Register the reply for `q` (with or without `isHighlight=true`).
    pub fn set_search(&self, q: &str, highlight: bool, total: u64, ids: &[u64]) {
        self.searches.lock().unwrap().insert(
            search_key(q, highlight),
            json!({ "total": total, "objectIDs": ids }),
        );
    }

    pub fn set_search_body(&self, q: &str, highlight: bool, body: Value) {
        self.searches
            .lock()
            .unwrap()
            .insert(search_key(q, highlight), body);
    }

    pub fn add_objects(&self, ids: &[u64]) {
        for id in ids {
            self.set_object(*id, MockReply::Json(object_payload(*id)), Duration::ZERO);
        }
    }

    pub fn add_slow_object(&self, id: u64, delay: Duration) {
        self.set_object(id, MockReply::Json(object_payload(id)), delay);
    }

    pub fn add_failing_object(&self, id: u64, status: u16) {
        self.set_object(id, MockReply::Status(status), Duration::ZERO);
    }

    pub fn add_imageless_object(&self, id: u64) {
        self.set_object(
            id,
            MockReply::Json(json!({ "objectID": id, "title": "No image" })),
            Duration::ZERO,
        );
    }

    fn set_object(&self, id: u64, reply: MockReply, delay: Duration) {
        self.objects
            .lock()
            .unwrap()
            .insert(id, MockObject { reply, delay });
    }

    /// Number of requests received for an exact path (e.g. `/objects/7`).
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Every `/search` query string received, in order.
    pub fn search_log(&self) -> Vec<HashMap<String, String>> {
        self.search_log.lock().unwrap().clone()
    }

    fn record_hit(&self, path: &str) {
        *self.hits.lock().unwrap().entry(path.to_owned()).or_insert(0) += 1;
    }

    /// Bind to an ephemeral port and serve in the background.
    ///
    /// Returns the base URL to hand to the client.
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

fn search_key(q: &str, highlight: bool) -> String {
    format!("{q}|{highlight}")
}

fn reply(reply: MockReply) -> Response {
    match reply {
        MockReply::Json(body) => axum::Json(body).into_response(),
        MockReply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}

async fn departments(State(api): State<Arc<MockApi>>) -> Response {
    api.record_hit("/departments");
    let configured = api.departments.lock().unwrap().clone();
    reply(configured.unwrap_or_else(|| MockReply::Json(json!({ "departments": [] }))))
}

async fn search(
    State(api): State<Arc<MockApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    api.record_hit("/search");
    api.search_log.lock().unwrap().push(params.clone());

    let q = params.get("q").cloned().unwrap_or_default();
    let highlight = params.get("isHighlight").is_some_and(|v| v == "true");
    let body = api
        .searches
        .lock()
        .unwrap()
        .get(&search_key(&q, highlight))
        .cloned()
        .unwrap_or_else(|| json!({ "total": 0, "objectIDs": null }));
    axum::Json(body).into_response()
}

async fn object(State(api): State<Arc<MockApi>>, Path(id): Path<u64>) -> Response {
    api.record_hit(&format!("/objects/{id}"));
    let configured = api.objects.lock().unwrap().get(&id).cloned();
    match configured {
        Some(object) => {
            if !object.delay.is_zero() {
                tokio::time::sleep(object.delay).await;
            }
            reply(object.reply)
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

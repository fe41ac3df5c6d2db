//! In-process FoodFinder backend
//!
//! Serves the four backend routes on an ephemeral port with canned replies,
//! and records what the client sent so tests can assert on the wire format.

use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Canned response for one route
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            content_type: "text/plain",
            body: body.to_string(),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// One multipart field as received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

struct StubState {
    recognize: Mutex<Reply>,
    search: Mutex<Reply>,
    dishes: Mutex<Reply>,
    health: Mutex<Reply>,
    uploads: Mutex<Vec<Vec<RecordedField>>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

pub struct StubBackend {
    base_url: String,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubBackend {
    /// Start with success replies on every route
    pub async fn start() -> Self {
        let state = Arc::new(StubState {
            recognize: Mutex::new(Reply::json(
                200,
                json!({
                    "success": true,
                    "predictions": [
                        {"food_name": "pizza", "confidence": 0.91, "class_id": 76, "description": "Italian flatbread"},
                        {"food_name": "flatbread", "confidence": 0.54, "class_id": 12, "description": ""}
                    ],
                    "top_prediction": {"food_name": "pizza", "confidence": 0.91, "class_id": 76, "description": "Italian flatbread"},
                    "model": "food101-resnet",
                    "message": "ok"
                }),
            )),
            search: Mutex::new(Reply::json(
                200,
                json!({
                    "dish": "pizza",
                    "location": {"lat": null, "lon": null},
                    "restaurants": [
                        {"id": 1, "name": "Tony's", "address": "Arbat 10", "rating": 4.7,
                         "price_range": "$$", "distance": "0.3km", "menu_link": "https://example.com/menu"}
                    ]
                }),
            )),
            dishes: Mutex::new(Reply::json(
                200,
                json!({"dishes": [
                    {"id": 1, "name": "pizza", "category": "Italian"},
                    {"id": 2, "name": "sushi", "category": "Japanese"}
                ]}),
            )),
            health: Mutex::new(Reply::json(200, json!({"status": "healthy"}))),
            uploads: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/food/recognize", post(recognize))
            .route("/api/restaurants/search", get(search))
            .route("/api/food/dishes", get(dishes))
            .route("/health", get(health))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub backend");
        let addr = listener.local_addr().expect("stub backend address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub backend");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_recognize(&self, reply: Reply) {
        *self.state.recognize.lock().unwrap() = reply;
    }

    pub fn set_search(&self, reply: Reply) {
        *self.state.search.lock().unwrap() = reply;
    }

    pub fn set_health(&self, reply: Reply) {
        *self.state.health.lock().unwrap() = reply;
    }

    /// Multipart fields of every recognize call
    pub fn uploads(&self) -> Vec<Vec<RecordedField>> {
        self.state.uploads.lock().unwrap().clone()
    }

    /// Query parameters of every search call
    pub fn queries(&self) -> Vec<HashMap<String, String>> {
        self.state.queries.lock().unwrap().clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn recognize(State(state): State<Arc<StubState>>, mut multipart: Multipart) -> Reply {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        fields.push(RecordedField {
            name,
            file_name,
            content_type,
            len,
        });
    }
    state.uploads.lock().unwrap().push(fields);
    state.recognize.lock().unwrap().clone()
}

async fn search(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    state.queries.lock().unwrap().push(params);
    state.search.lock().unwrap().clone()
}

async fn dishes(State(state): State<Arc<StubState>>) -> Reply {
    state.dishes.lock().unwrap().clone()
}

async fn health(State(state): State<Arc<StubState>>) -> Reply {
    state.health.lock().unwrap().clone()
}

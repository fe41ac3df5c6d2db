//! In-process IP-geolocation endpoint
//!
//! Answers `GET /json` with one canned reply and counts lookups.

use super::stub_backend::Reply;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

struct LocationState {
    reply: Mutex<Reply>,
    lookups: AtomicUsize,
}

pub struct LocationStub {
    endpoint: String,
    state: Arc<LocationState>,
    handle: JoinHandle<()>,
}

impl LocationStub {
    pub async fn start(reply: Reply) -> Self {
        let state = Arc::new(LocationState {
            reply: Mutex::new(reply),
            lookups: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/json", get(lookup))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind location stub");
        let addr = listener.local_addr().expect("location stub address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("location stub");
        });

        Self {
            endpoint: format!("http://{}/json", addr),
            state,
            handle,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn lookups(&self) -> usize {
        self.state.lookups.load(Ordering::SeqCst)
    }
}

impl Drop for LocationStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn lookup(State(state): State<Arc<LocationState>>) -> Reply {
    state.lookups.fetch_add(1, Ordering::SeqCst);
    state.reply.lock().unwrap().clone()
}

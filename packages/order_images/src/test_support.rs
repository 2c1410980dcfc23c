//! In-process image host used by the download and orchestration tests.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct HostState {
    files: Arc<HashMap<String, Vec<u8>>>,
    delays: Arc<HashMap<String, Duration>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

/// Serves a fixed set of files over HTTP on an ephemeral local port.
/// Unknown paths answer `404 Not Found`.
#[derive(Default)]
pub struct MockHost {
    files: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
    state: HostState,
    base: String,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, body: impl AsRef<[u8]>) -> Self {
        self.files.insert(path.to_string(), body.as_ref().to_vec());
        self
    }

    /// Holds the response for `path` back by `delay`
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub async fn serve(mut self) -> Self {
        self.state.files = Arc::new(std::mem::take(&mut self.files));
        self.state.delays = Arc::new(std::mem::take(&mut self.delays));
        let app = Router::new()
            .route("/{*path}", get(serve_file))
            .with_state(self.state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        self.base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Total number of requests received
    pub fn hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }

    /// Requests received for one path
    pub fn hits_for(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

async fn serve_file(State(state): State<HostState>, Path(path): Path<String>) -> Response {
    *state.hits.lock().unwrap().entry(path.clone()).or_default() += 1;
    if let Some(delay) = state.delays.get(&path) {
        tokio::time::sleep(*delay).await;
    }
    match state.files.get(&path) {
        Some(body) => (StatusCode::OK, body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

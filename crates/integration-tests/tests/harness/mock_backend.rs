//! Mock backend server for integration tests
//!
//! Accepts any request on any path, records it, and answers with a canned
//! status and JSON body.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use tokio_util::sync::CancellationToken;

/// One request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    /// Header value as a string, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }

    /// Value of a form-encoded body field
    pub fn form_field(&self, name: &str) -> Option<String> {
        self.body.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.replace('+', " ").replace("%20", " "))
        })
    }
}

struct MockState {
    status: StatusCode,
    body: serde_json::Value,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock HTTP backend bound to an ephemeral local port
pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockBackend {
    /// Start a mock answering 200 with `body`
    pub async fn start(body: serde_json::Value) -> anyhow::Result<Self> {
        Self::start_inner(StatusCode::OK, body, None).await
    }

    /// Start a mock answering `status` with `body`
    pub async fn start_with_status(status: StatusCode, body: serde_json::Value) -> anyhow::Result<Self> {
        Self::start_inner(status, body, None).await
    }

    /// Start a mock that waits `delay` before answering
    pub async fn start_delayed(body: serde_json::Value, delay: Duration) -> anyhow::Result<Self> {
        Self::start_inner(StatusCode::OK, body, Some(delay)).await
    }

    async fn start_inner(
        status: StatusCode,
        body: serde_json::Value,
        delay: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            status,
            body,
            delay,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Root URL of the mock, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The single request received, failing the test otherwise
    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request, got {requests:?}");
        requests.into_iter().next().unwrap()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    (state.status, axum::Json(state.body.clone()))
}

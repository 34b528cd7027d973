//! Shared helpers for handler tests: in-process stub backends and state.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Router,
};
use bytes::Bytes;
use serde_json::Value;

use crate::config::Config;
use crate::state::AppState;

/// A request as the stub backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<RecordedRequest>>>);

impl Recorder {
    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn last(&self) -> RecordedRequest {
        self.0
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("stub backend received no request")
    }
}

/// Fixed answer the stub backend gives to every request.
#[derive(Clone)]
pub struct StubReply {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl StubReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, "application/json", &body.to_string())
    }

    pub fn text(status: u16, content_type: &str, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.to_string(),
            body: body.to_string(),
        }
    }
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Backend that records every request and answers with `reply`.
pub async fn spawn_stub(reply: StubReply) -> (String, Recorder) {
    let recorder = Recorder::default();
    let router = Router::new()
        .fallback(record)
        .with_state((recorder.clone(), reply));
    (spawn_backend(router).await, recorder)
}

async fn record(
    State((recorder, reply)): State<(Recorder, StubReply)>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();

    recorder.0.lock().unwrap().push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    });

    Response::builder()
        .status(reply.status)
        .header(header::CONTENT_TYPE, reply.content_type)
        .body(Body::from(reply.body))
        .unwrap()
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn test_config(backend_url: &str) -> Config {
    let backend_url = backend_url.to_string();
    Config::from_lookup(move |key: &str| match key {
        "BACKEND_API_URL" => Some(backend_url.clone()),
        "RELAY_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn test_state(config: Config) -> AppState {
    AppState::from_config(&config).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

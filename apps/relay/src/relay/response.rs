use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON response from API";

/// What the relay hands back: the backend status, untouched, and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CACHE_CONTROL, "no-store")],
            Json(self.body),
        )
            .into_response()
    }
}

/// Reads the backend response. Only a failure to read the body is an error;
/// every status code is kept as-is.
pub async fn normalize(response: reqwest::Response) -> Result<RelayedResponse, reqwest::Error> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?;

    Ok(normalize_parts(status, content_type.as_deref(), &body))
}

/// Declared-JSON bodies are parsed (or replaced with the invalid-JSON
/// envelope); anything else is wrapped as `{"message": <text>}`.
pub fn normalize_parts(status: u16, content_type: Option<&str>, body: &[u8]) -> RelayedResponse {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Backend declared JSON but sent something else ({status}): {e}");
                json!({ "error": INVALID_JSON_MESSAGE })
            }
        }
    } else {
        json!({ "message": String::from_utf8_lossy(body) })
    };

    RelayedResponse { status, body }
}

//! API Relay — forwards same-origin requests to the backend API.
//!
//! Stateless per request: resolve credential, pick a body encoding, send
//! once (no retry), reflect the backend status, normalize the body to JSON.
//! Only a transport failure is the relay's own error.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::credentials::RequestContext;
use crate::state::AppState;

pub mod body;
pub mod client;
pub mod handlers;
pub mod response;

pub use body::OutboundBody;
pub use client::BackendClient;
pub use response::RelayedResponse;

/// The methods the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RelayMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            RelayMethod::Get => reqwest::Method::GET,
            RelayMethod::Post => reqwest::Method::POST,
            RelayMethod::Put => reqwest::Method::PUT,
            RelayMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Whether the inbound query string goes to the backend.
    pub fn forwards_query(self) -> bool {
        matches!(self, RelayMethod::Get | RelayMethod::Delete)
    }

    /// Fixed envelope message used when the backend cannot be reached.
    pub fn transport_message(self) -> &'static str {
        match self {
            RelayMethod::Get => "Failed to fetch data from API",
            RelayMethod::Post => "Failed to send data to API",
            RelayMethod::Put => "Failed to update data in API",
            RelayMethod::Delete => "Failed to delete data from API",
        }
    }
}

impl fmt::Display for RelayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{}", .method.transport_message())]
    Transport {
        method: RelayMethod,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::Transport { method, source } => {
                error!("{method} relay to backend failed: {source}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::InvalidBody(msg) => {
                warn!("Rejected relay request body: {msg}");
                StatusCode::BAD_REQUEST
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Relayed request, after the inbound body has been read.
pub struct RelayRequest {
    pub method: RelayMethod,
    pub suffix: String,
    pub query: Option<String>,
    pub body: OutboundBody,
}

/// Forwards one request and normalizes the backend's answer.
pub async fn relay(
    state: &AppState,
    ctx: &RequestContext,
    request: RelayRequest,
) -> Result<RelayedResponse, RelayError> {
    let RelayRequest {
        method,
        suffix,
        query,
        body,
    } = request;

    let credential = state.token_resolver.resolve(ctx).await;
    let query = query.filter(|_| method.forwards_query());

    let builder = state
        .backend
        .request(method, &suffix, query.as_deref(), credential.as_ref());
    let builder = body.apply(builder)?;

    let response = builder
        .send()
        .await
        .map_err(|source| RelayError::Transport { method, source })?;

    let relayed = response::normalize(response)
        .await
        .map_err(|source| RelayError::Transport { method, source })?;

    info!(
        "{method} /{suffix} -> {} (authenticated: {})",
        relayed.status,
        credential.is_some()
    );

    Ok(relayed)
}

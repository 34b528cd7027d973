//! Axum route handlers for `/relay/*path`.
//!
//! The suffix is cut from the raw request path rather than taken through
//! `Path`, so percent-escapes (`%2F`, `%3F`, `%23`, invalid UTF-8) reach the
//! backend exactly as the browser sent them.

use axum::{
    extract::{RawQuery, Request, State},
    http::{HeaderMap, Uri},
};

use crate::credentials::RequestContext;
use crate::relay::{relay, OutboundBody, RelayError, RelayMethod, RelayRequest, RelayedResponse};
use crate::state::AppState;

const RELAY_PREFIX: &str = "/relay/";

/// GET /relay/*path
pub async fn handle_get(
    State(state): State<AppState>,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<RelayedResponse, RelayError> {
    let suffix = raw_suffix(&uri);
    forward_without_body(&state, RelayMethod::Get, suffix, query, &headers).await
}

/// DELETE /relay/*path
pub async fn handle_delete(
    State(state): State<AppState>,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<RelayedResponse, RelayError> {
    let suffix = raw_suffix(&uri);
    forward_without_body(&state, RelayMethod::Delete, suffix, query, &headers).await
}

/// POST /relay/*path
pub async fn handle_post(
    State(state): State<AppState>,
    request: Request,
) -> Result<RelayedResponse, RelayError> {
    let suffix = raw_suffix(request.uri());
    forward_with_body(&state, RelayMethod::Post, suffix, request).await
}

/// PUT /relay/*path
pub async fn handle_put(
    State(state): State<AppState>,
    request: Request,
) -> Result<RelayedResponse, RelayError> {
    let suffix = raw_suffix(request.uri());
    forward_with_body(&state, RelayMethod::Put, suffix, request).await
}

/// The still-encoded path after `/relay/`.
fn raw_suffix(uri: &Uri) -> String {
    uri.path()
        .strip_prefix(RELAY_PREFIX)
        .unwrap_or_default()
        .to_string()
}

async fn forward_without_body(
    state: &AppState,
    method: RelayMethod,
    suffix: String,
    query: Option<String>,
    headers: &HeaderMap,
) -> Result<RelayedResponse, RelayError> {
    let ctx = RequestContext::from_headers(headers);
    relay(
        state,
        &ctx,
        RelayRequest {
            method,
            suffix,
            query,
            body: OutboundBody::Empty,
        },
    )
    .await
}

async fn forward_with_body(
    state: &AppState,
    method: RelayMethod,
    suffix: String,
    request: Request,
) -> Result<RelayedResponse, RelayError> {
    let ctx = RequestContext::from_headers(request.headers());
    let body = OutboundBody::from_request(method, request).await?;
    relay(
        state,
        &ctx,
        RelayRequest {
            method,
            suffix,
            query: None,
            body,
        },
    )
    .await
}

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::credentials::RequestContext;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub source: &'static str,
}

/// GET /auth/token
///
/// Hands the resolved credential to browser code that calls the backend
/// directly. 401 when the caller has none.
pub async fn handle_get_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let credential = state
        .token_resolver
        .resolve(&ctx)
        .await
        .ok_or(AppError::Unauthorized)?;

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(TokenResponse {
            token: credential.as_str().to_string(),
            source: state.token_resolver.source_name(),
        }),
    ))
}

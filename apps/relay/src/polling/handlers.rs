use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::credentials::RequestContext;
use crate::errors::AppError;
use crate::polling::{PollError, PollState};
use crate::state::AppState;

const DEFAULT_WAIT_SECS: u64 = 30;
const MAX_WAIT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
pub struct WaitQuery {
    pub timeout_secs: Option<u64>,
}

/// GET /reviews/:id/wait
///
/// Polls the backend until the review is completed or failed, then returns
/// the review JSON. On timeout answers 202 with the last status seen.
/// If the client disconnects, the handler future is dropped and the poll
/// with it.
pub async fn handle_wait_for_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Query(params): Query<WaitQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let timeout_secs = params.timeout_secs.unwrap_or(DEFAULT_WAIT_SECS);
    if timeout_secs == 0 || timeout_secs > MAX_WAIT_SECS {
        return Err(AppError::Validation(format!(
            "timeout_secs must be between 1 and {MAX_WAIT_SECS}"
        )));
    }

    let ctx = RequestContext::from_headers(&headers);
    let credential = state.token_resolver.resolve(&ctx).await;
    let mut handle = state.poller.spawn(&review_id, credential);

    let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), handle.wait_done()).await;

    let response = match outcome {
        Ok(PollState::Observed(snapshot)) => {
            info!("Review {review_id} reached {:?}", snapshot.status);
            (StatusCode::OK, no_store(), Json(snapshot.body)).into_response()
        }
        Ok(PollState::Failed(e)) => return Err(poll_error(&review_id, e)),
        Ok(PollState::Waiting) | Err(_) => {
            let last = match handle.latest() {
                PollState::Observed(snapshot) => json!(snapshot.status),
                _ => json!(null),
            };
            (
                StatusCode::ACCEPTED,
                no_store(),
                Json(json!({ "status": last, "timed_out": true })),
            )
                .into_response()
        }
    };

    Ok(response)
}

fn no_store() -> [(header::HeaderName, &'static str); 1] {
    [(header::CACHE_CONTROL, "no-store")]
}

fn poll_error(review_id: &str, e: PollError) -> AppError {
    match e {
        PollError::Status { status: 401 } => AppError::Unauthorized,
        PollError::Status { status: 404 } => {
            AppError::NotFound(format!("Review {review_id} not found"))
        }
        other => AppError::Upstream(other.to_string()),
    }
}

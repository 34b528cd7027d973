pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::credentials::handlers as auth;
use crate::polling::handlers as polling;
use crate::relay::body::MAX_BODY_BYTES;
use crate::relay::handlers as relay;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Credential hand-off for direct backend calls
        .route("/auth/token", get(auth::handle_get_token))
        // Review status polling
        .route("/reviews/:id/wait", get(polling::handle_wait_for_review))
        // Same-origin relay to the backend API
        .route(
            "/relay/*path",
            get(relay::handle_get)
                .post(relay::handle_post)
                .put(relay::handle_put)
                .delete(relay::handle_delete),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::{body_json, test_config, test_state, unreachable_url};

    #[tokio::test]
    async fn test_health() {
        let router = build_router(test_state(test_config(&unreachable_url().await)));
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["credential_source"], "session");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let router = build_router(test_state(test_config(&unreachable_url().await)));
        let response = router
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

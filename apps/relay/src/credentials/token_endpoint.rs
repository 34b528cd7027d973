use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::{Credential, CredentialError, CredentialSource, RequestContext};

/// Field names a token-issuing endpoint may use, checked in order.
const TOKEN_FIELDS: [&str; 3] = ["access_token", "accessToken", "token"];

/// Fetches the credential from a token-issuing endpoint, forwarding the
/// caller's cookies so the endpoint can identify the session.
///
/// 401/403 from the endpoint means "not signed in" and resolves to `None`.
/// Any other failure is a `CredentialError`. There is no retry.
pub struct TokenEndpointSource {
    client: Client,
    url: String,
}

impl TokenEndpointSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for TokenEndpointSource {
    fn name(&self) -> &'static str {
        "token-endpoint"
    }

    async fn credential(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Credential>, CredentialError> {
        let Some(cookies) = ctx.cookie_header() else {
            debug!("No cookies on request, skipping token endpoint");
            return Ok(None);
        };

        let response = self
            .client
            .get(&self.url)
            .header(header::COOKIE, cookies)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| CredentialError::Fetch(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CredentialError::Fetch(format!(
                "token endpoint returned status {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        extract_token(&body)
    }
}

fn extract_token(body: &Value) -> Result<Option<Credential>, CredentialError> {
    for field in TOKEN_FIELDS {
        match body.get(field) {
            Some(Value::String(token)) => return Ok(Credential::new(token)),
            Some(Value::Null) => return Ok(None),
            Some(_) => {
                return Err(CredentialError::Malformed(format!(
                    "'{field}' is not a string"
                )))
            }
            None => continue,
        }
    }
    Err(CredentialError::Malformed(
        "no access_token, accessToken or token field".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_stub, unreachable_url, StubReply};
    use axum::http::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn ctx_with_session() -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("session_id=s1"),
        );
        RequestContext::from_headers(&headers)
    }

    #[test]
    fn test_extract_token_fields() {
        assert_eq!(
            extract_token(&json!({"access_token": "a"})).unwrap().unwrap().as_str(),
            "a"
        );
        assert_eq!(
            extract_token(&json!({"accessToken": "b"})).unwrap().unwrap().as_str(),
            "b"
        );
        assert_eq!(
            extract_token(&json!({"token": "c"})).unwrap().unwrap().as_str(),
            "c"
        );
        assert!(extract_token(&json!({"token": null})).unwrap().is_none());
        assert!(extract_token(&json!({"user": "x"})).is_err());
        assert!(extract_token(&json!({"token": 5})).is_err());
    }

    #[tokio::test]
    async fn test_fetches_token_with_cookies() {
        let (url, recorder) =
            spawn_stub(StubReply::json(200, json!({"access_token": "abc123"}))).await;
        let source = TokenEndpointSource::new(Client::new(), format!("{url}/api/auth/token"));

        let credential = source.credential(&ctx_with_session()).await.unwrap();
        assert_eq!(credential.unwrap().as_str(), "abc123");

        let seen = recorder.last();
        assert_eq!(seen.path, "/api/auth/token");
        assert_eq!(seen.header("cookie"), Some("session_id=s1"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_none() {
        let (url, _) = spawn_stub(StubReply::json(401, json!({"detail": "no session"}))).await;
        let source = TokenEndpointSource::new(Client::new(), url);
        assert!(source.credential(&ctx_with_session()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_error() {
        let (url, _) = spawn_stub(StubReply::text(500, "text/plain", "boom")).await;
        let source = TokenEndpointSource::new(Client::new(), url);
        let err = source.credential(&ctx_with_session()).await.unwrap_err();
        assert!(matches!(err, CredentialError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fetch_error() {
        let source = TokenEndpointSource::new(Client::new(), unreachable_url().await);
        let err = source.credential(&ctx_with_session()).await.unwrap_err();
        assert!(matches!(err, CredentialError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_no_cookies_skips_call() {
        let (url, recorder) = spawn_stub(StubReply::json(200, json!({"token": "t"}))).await;
        let source = TokenEndpointSource::new(Client::new(), url);
        assert!(source
            .credential(&RequestContext::default())
            .await
            .unwrap()
            .is_none());
        assert_eq!(recorder.count(), 0);
    }
}

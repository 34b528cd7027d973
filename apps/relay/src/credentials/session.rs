use async_trait::async_trait;

use super::{Credential, CredentialError, CredentialSource, RequestContext};

/// Reads the credential from a server-managed session cookie.
pub struct SessionCookieSource {
    cookie_name: String,
}

impl SessionCookieSource {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for SessionCookieSource {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn credential(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Credential>, CredentialError> {
        Ok(ctx.cookie(&self.cookie_name).and_then(Credential::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn ctx_with_cookie(cookie: &'static str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(cookie));
        RequestContext::from_headers(&headers)
    }

    #[tokio::test]
    async fn test_reads_named_cookie() {
        let source = SessionCookieSource::new("access_token");
        let found = source
            .credential(&ctx_with_cookie("access_token=abc123"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().as_str(), "abc123");
    }

    #[tokio::test]
    async fn test_missing_or_empty_cookie_is_none() {
        let source = SessionCookieSource::new("access_token");
        assert!(source
            .credential(&ctx_with_cookie("other=1"))
            .await
            .unwrap()
            .is_none());
        assert!(source
            .credential(&ctx_with_cookie("access_token="))
            .await
            .unwrap()
            .is_none());
    }
}

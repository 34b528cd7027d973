//! Token Resolver — produces zero-or-one bearer credential per request.
//!
//! One `CredentialSource` is picked at startup from `CREDENTIAL_SOURCE` and
//! carried in `AppState` behind a `TokenResolver`. Handlers build a
//! `RequestContext` from the inbound headers and hand it to the resolver;
//! nothing else reads cookies or auth headers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, CredentialSourceKind};

pub mod bearer;
pub mod handlers;
pub mod session;
pub mod token_endpoint;

pub use bearer::BearerHeaderSource;
pub use session::SessionCookieSource;
pub use token_endpoint::TokenEndpointSource;

// ────────────────────────────────────────────────────────────────────────────
// Credential + request context
// ────────────────────────────────────────────────────────────────────────────

/// An opaque bearer token. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for empty or whitespace-only tokens.
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The slice of inbound request state a credential source may look at.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cookies: HashMap<String, String>,
    cookie_header: Option<String>,
    authorization: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw_cookies: Vec<&str> = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        let mut cookies = HashMap::new();
        for raw in &raw_cookies {
            for (name, value) in parse_cookie_header(raw) {
                cookies.entry(name).or_insert(value);
            }
        }

        let cookie_header = if raw_cookies.is_empty() {
            None
        } else {
            Some(raw_cookies.join("; "))
        };

        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            cookies,
            cookie_header,
            authorization,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// All inbound cookies joined back into a single `Cookie` header value.
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }
}

/// Splits a `Cookie` header into name/value pairs. Quoted values are unquoted.
fn parse_cookie_header(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Token endpoint request failed: {0}")]
    Fetch(String),

    #[error("Token endpoint response malformed: {0}")]
    Malformed(String),
}

/// A place a bearer credential can come from. Implement this to add a new
/// authentication strategy without touching the relay handlers.
///
/// `Ok(None)` means "this caller has no credential", which is not an error.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn credential(&self, ctx: &RequestContext)
        -> Result<Option<Credential>, CredentialError>;
}

/// Wraps the configured source and folds its failures into "no credential".
#[derive(Clone)]
pub struct TokenResolver {
    source: Arc<dyn CredentialSource>,
}

impl TokenResolver {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Never fails: a source error is logged and the request proceeds
    /// unauthenticated so the backend can reject it.
    pub async fn resolve(&self, ctx: &RequestContext) -> Option<Credential> {
        match self.source.credential(ctx).await {
            Ok(Some(credential)) => Some(credential),
            Ok(None) => {
                debug!("No credential from {} source", self.source.name());
                None
            }
            Err(e) => {
                warn!(
                    "Credential lookup via {} failed, continuing unauthenticated: {e}",
                    self.source.name()
                );
                None
            }
        }
    }
}

/// Builds the one credential source selected by configuration.
pub fn build_source(
    config: &Config,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn CredentialSource>> {
    let source: Arc<dyn CredentialSource> = match config.credential_source {
        CredentialSourceKind::Session => {
            Arc::new(SessionCookieSource::new(config.session_cookie_name.clone()))
        }
        CredentialSourceKind::Bearer => Arc::new(BearerHeaderSource),
        CredentialSourceKind::TokenEndpoint => {
            let url = config.token_endpoint_url.clone().ok_or_else(|| {
                anyhow::anyhow!("TOKEN_ENDPOINT_URL is required for the token-endpoint source")
            })?;
            Arc::new(TokenEndpointSource::new(http, url))
        }
    };

    info!("Credential source: {}", source.name());
    Ok(source)
}

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_PREFIX: &str = "api";
pub const DEFAULT_SESSION_COOKIE: &str = "access_token";

/// Which place the relay looks for the caller's bearer credential.
/// Exactly one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSourceKind {
    /// Server-managed session cookie.
    Session,
    /// `Authorization: Bearer` header set by browser code from local storage.
    Bearer,
    /// Dedicated token-issuing endpoint, called with the inbound cookies.
    TokenEndpoint,
}

impl FromStr for CredentialSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" | "cookie" => Ok(Self::Session),
            "bearer" | "header" => Ok(Self::Bearer),
            "token-endpoint" | "token_endpoint" => Ok(Self::TokenEndpoint),
            other => Err(anyhow!(
                "Unknown CREDENTIAL_SOURCE '{other}' (expected session, bearer or token-endpoint)"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default except `TOKEN_ENDPOINT_URL`, which is
/// required when `CREDENTIAL_SOURCE=token-endpoint`.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub api_prefix: String,
    pub port: u16,
    pub rust_log: String,
    pub credential_source: CredentialSourceKind,
    pub session_cookie_name: String,
    pub token_endpoint_url: Option<String>,
    pub relay_timeout_secs: u64,
    pub review_poll_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credential_source = match var("CREDENTIAL_SOURCE") {
            Some(raw) => raw.parse()?,
            None => CredentialSourceKind::Session,
        };

        let token_endpoint_url = var("TOKEN_ENDPOINT_URL");
        if credential_source == CredentialSourceKind::TokenEndpoint && token_endpoint_url.is_none()
        {
            bail!("TOKEN_ENDPOINT_URL must be set when CREDENTIAL_SOURCE=token-endpoint");
        }

        Ok(Config {
            backend_url: var("BACKEND_API_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            api_prefix: var("BACKEND_API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            port: parse_or("PORT", var("PORT"), 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            credential_source,
            session_cookie_name: var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            token_endpoint_url,
            relay_timeout_secs: parse_or("RELAY_TIMEOUT_SECS", var("RELAY_TIMEOUT_SECS"), 30)?,
            review_poll_interval_ms: parse_or(
                "REVIEW_POLL_INTERVAL_MS",
                var("REVIEW_POLL_INTERVAL_MS"),
                2000,
            )?,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{v}'")),
        None => Ok(default),
    }
}

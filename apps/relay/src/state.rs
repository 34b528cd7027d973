use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::credentials::{build_source, TokenResolver};
use crate::polling::StatusPoller;
use crate::relay::BackendClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; clones share the backend connection pool.
#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    /// Wraps the one credential source selected by `CREDENTIAL_SOURCE`.
    pub token_resolver: TokenResolver,
    pub poller: StatusPoller,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = BackendClient::new(
            &config.backend_url,
            &config.api_prefix,
            Duration::from_secs(config.relay_timeout_secs),
        )?;

        let source = build_source(config, backend.http())?;
        let poller = StatusPoller::new(
            backend.clone(),
            Duration::from_millis(config.review_poll_interval_ms),
        );

        Ok(Self {
            backend,
            token_resolver: TokenResolver::new(source),
            poller,
        })
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, RequestBuilder};

use super::RelayMethod;
use crate::credentials::Credential;

/// The one pooled HTTP client for everything bound to the backend API.
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_prefix: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_prefix: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: api_prefix.trim_matches('/').to_string(),
        })
    }

    /// The underlying client, shared with the token-endpoint credential source.
    pub fn http(&self) -> Client {
        self.client.clone()
    }

    /// `<base>/<api-prefix>/<suffix>[?query]`. Slashes at the joints are
    /// collapsed; the query is appended verbatim.
    pub fn endpoint(&self, suffix: &str, query: Option<&str>) -> String {
        let mut url = self.base_url.clone();
        for segment in [self.api_prefix.as_str(), suffix.trim_start_matches('/')] {
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }

        if let Some(q) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        url
    }

    /// Starts a backend request with the no-cache and bearer headers set.
    pub fn request(
        &self,
        method: RelayMethod,
        suffix: &str,
        query: Option<&str>,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let builder = self
            .client
            .request(method.as_reqwest(), self.endpoint(suffix, query))
            .header(header::CACHE_CONTROL, "no-cache");

        match credential {
            Some(c) => builder.bearer_auth(c.as_str()),
            None => builder,
        }
    }
}

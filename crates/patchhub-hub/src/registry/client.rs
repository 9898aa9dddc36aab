//! GitHub search API client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::parse::parse_search_response;
use super::{RegistryError, RegistrySearch, SearchQuery, SearchResultItem};
use crate::error::{HubError, HubResult};
use crate::ports::CredentialStore;

/// Default search API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default `User-Agent` for upstream requests.
pub const DEFAULT_USER_AGENT: &str = concat!("PatchHub/", env!("CARGO_PKG_VERSION"));

/// Search responses larger than this are refused (2 MiB).
pub const MAX_RESPONSE_BYTES: u64 = 2 * 1024 * 1024;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection timeout, capped by the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Search client for the GitHub repository search endpoint.
///
/// Issues exactly one request per search, never follows redirects, and
/// attaches a bearer token when the credential store has one.
pub struct GithubRegistryClient {
    client: reqwest::Client,
    api_base: String,
    credentials: Option<Arc<dyn CredentialStore>>,
    max_response_bytes: u64,
}

impl fmt::Debug for GithubRegistryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubRegistryClient")
            .field("api_base", &self.api_base)
            .field("has_credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl GithubRegistryClient {
    /// Create a client with the default base URL, user agent and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::RegistryUnavailable`] if the HTTP client cannot be
    /// built (e.g. TLS backend unavailable).
    pub fn new() -> HubResult<Self> {
        Self::with_options(DEFAULT_API_BASE, DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Create a client with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::RegistryUnavailable`] if the HTTP client cannot be
    /// built.
    pub fn with_options(api_base: &str, user_agent: &str, timeout: Duration) -> HubResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                HubError::RegistryUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            credentials: None,
            max_response_bytes: MAX_RESPONSE_BYTES,
        })
    }

    /// Attach a credential store for the bearer token.
    #[must_use]
    pub fn with_credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Override the response size cap.
    #[must_use]
    pub fn with_max_response_bytes(mut self, bytes: u64) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/search/repositories", self.api_base)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, RegistryError> {
        if let Some(len) = response.content_length()
            && len > self.max_response_bytes
        {
            return Err(RegistryError::UnexpectedSchema("response is too large".into()));
        }

        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        let mut received: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RegistryError::Unavailable(e.without_url().to_string()))?;
            received = received.saturating_add(chunk.len() as u64);
            if received > self.max_response_bytes {
                return Err(RegistryError::UnexpectedSchema("response is too large".into()));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl RegistrySearch for GithubRegistryClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>, RegistryError> {
        let q = query.upstream_query();
        debug!(q = %q, kind = %query.kind, "querying registry");

        let mut request = self
            .client
            .get(self.endpoint())
            .query(&[("q", q.as_str())])
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = self.credentials.as_ref().and_then(|c| c.get_token()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            warn!(error = %e, "registry request failed");
            RegistryError::Unavailable(if e.is_timeout() {
                "request timed out".into()
            } else {
                "request failed".into()
            })
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%status, "registry rate limited the request");
            return Err(RegistryError::RateLimited);
        }
        if status.is_server_error() {
            warn!(%status, "registry server error");
            return Err(RegistryError::Unavailable(format!("registry returned {status}")));
        }
        if !status.is_success() {
            warn!(%status, "unexpected registry status");
            return Err(RegistryError::UnexpectedSchema(format!(
                "registry returned {status}"
            )));
        }

        let body = self.read_body(response).await?;
        let items = parse_search_response(&body, &query.publisher_org)?;
        debug!(count = items.len(), "registry search complete");
        Ok(items)
    }
}

//! Registry search: query construction, the HTTP client and response parsing.

mod client;
mod parse;
mod query;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::{DEFAULT_API_BASE, DEFAULT_USER_AGENT, GithubRegistryClient, MAX_RESPONSE_BYTES};
pub use parse::{MISSING_ITEMS_MESSAGE, parse_search_response};
pub use query::{MAX_TERM_LEN, SearchQuery, sanitize_term};

use crate::artifact::{ArtifactId, BranchName};
use crate::error::HubError;

/// One repository returned by a search, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Repository name.
    pub identifier: ArtifactId,
    /// Free-form description, if the publisher set one.
    pub description: Option<String>,
    /// Canonical repository page under the publisher organization.
    pub page_url: String,
    /// Branch the install archive is taken from.
    pub default_branch: BranchName,
    /// Star count.
    pub stars: u64,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Network failure, timeout or upstream 5xx.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
    /// Upstream refused because of its own rate limit.
    #[error("registry rate limit exceeded")]
    RateLimited,
    /// The response could not be interpreted.
    #[error("unexpected registry response: {0}")]
    UnexpectedSchema(String),
}

impl From<RegistryError> for HubError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(msg) => Self::RegistryUnavailable(msg),
            RegistryError::RateLimited => Self::RateLimitedByUpstream,
            RegistryError::UnexpectedSchema(msg) => Self::UnexpectedSchema(msg),
        }
    }
}

/// Searches the registry for repositories under the publisher organization.
#[async_trait]
pub trait RegistrySearch: Send + Sync {
    /// Run one search. Invalid items are dropped; order is preserved.
    ///
    /// # Errors
    ///
    /// See [`RegistryError`].
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>, RegistryError>;
}

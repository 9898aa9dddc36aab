//! HTTP archive download.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, warn};

use super::extract::{ExtractLimits, extract_zip};
use crate::error::{HubError, HubResult};
use crate::ports::{ArchiveFetcher, Staging};
use crate::registry::DEFAULT_USER_AGENT;
use crate::validate::{ArchiveUrl, REGISTRY_HOST};

/// Host GitHub serves branch archives from after redirecting.
pub const ARCHIVE_CDN_HOST: &str = "codeload.github.com";

/// Default maximum archive size (50 MB).
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum number of redirects followed for one download.
const MAX_REDIRECTS: u32 = 5;

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// [`ArchiveFetcher`] that downloads over HTTPS and extracts zip archives.
///
/// Redirects are followed by hand: every hop must be `https` on an
/// allow-listed host at the default port. Archives are extracted into a
/// fresh temporary directory under `staging_dir`, which should sit on the
/// same filesystem as the install root so the final move is a rename.
pub struct HttpArchiveFetcher {
    client: reqwest::Client,
    staging_dir: PathBuf,
    allowed_hosts: Vec<String>,
    max_archive_bytes: u64,
    limits: ExtractLimits,
    allow_loopback_http: bool,
}

impl fmt::Debug for HttpArchiveFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpArchiveFetcher")
            .field("staging_dir", &self.staging_dir)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("max_archive_bytes", &self.max_archive_bytes)
            .finish_non_exhaustive()
    }
}

impl HttpArchiveFetcher {
    /// Create a fetcher staging extractions under `staging_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::FetchFailed`] if the HTTP client cannot be built.
    pub fn new(staging_dir: impl Into<PathBuf>) -> HubResult<Self> {
        Self::with_user_agent(staging_dir, DEFAULT_USER_AGENT)
    }

    /// Like [`new`](Self::new) with an explicit `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::FetchFailed`] if the HTTP client cannot be built.
    pub fn with_user_agent(staging_dir: impl Into<PathBuf>, user_agent: &str) -> HubResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|e| HubError::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            staging_dir: staging_dir.into(),
            allowed_hosts: vec![REGISTRY_HOST.to_owned(), ARCHIVE_CDN_HOST.to_owned()],
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            limits: ExtractLimits::default(),
            allow_loopback_http: false,
        })
    }

    /// Also accept plain `http` hops to 127.0.0.1 on any port.
    #[cfg(test)]
    fn allowing_loopback(mut self) -> Self {
        self.allow_loopback_http = true;
        self
    }

    /// Replace the hosts redirects may lead to.
    #[must_use]
    pub fn with_allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_hosts = hosts;
        self
    }

    /// Override the maximum download size in bytes.
    #[must_use]
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_archive_bytes = bytes;
        self
    }

    /// Override extraction caps.
    #[must_use]
    pub fn with_limits(mut self, limits: ExtractLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Check that a redirect target may be followed.
    fn validate_hop(&self, url: &url::Url) -> HubResult<()> {
        let public = url.scheme() == "https"
            && url.port().is_none()
            && url
                .host_str()
                .is_some_and(|host| self.allowed_hosts.iter().any(|h| h == host));
        let loopback = self.allow_loopback_http
            && url.scheme() == "http"
            && url.host_str() == Some("127.0.0.1");
        let allowed =
            url.username().is_empty() && url.password().is_none() && (public || loopback);
        if allowed {
            Ok(())
        } else {
            warn!(host = url.host_str().unwrap_or(""), "refusing archive redirect");
            Err(HubError::FetchFailed("redirect to a disallowed location".into()))
        }
    }

    async fn follow_redirects(&self, start: &url::Url) -> HubResult<reqwest::Response> {
        let mut current = start.clone();

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| HubError::FetchFailed(format!("request failed: {}", e.without_url())))?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| HubError::FetchFailed("redirect without Location header".into()))?;
            let next = current
                .join(location)
                .map_err(|_| HubError::FetchFailed("redirect to an invalid URL".into()))?;

            self.validate_hop(&next)?;
            debug!(host = next.host_str().unwrap_or(""), "following validated redirect");
            current = next;
        }

        Err(HubError::FetchFailed("too many redirects".into()))
    }

    async fn download(&self, start: &url::Url) -> HubResult<Vec<u8>> {
        let response = self.follow_redirects(start).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::FetchFailed(format!(
                "archive download returned {status}"
            )));
        }

        if let Some(len) = response.content_length()
            && len > self.max_archive_bytes
        {
            return Err(HubError::FetchFailed(format!(
                "archive exceeds the {} byte limit",
                self.max_archive_bytes
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                HubError::FetchFailed(format!("failed to read archive body: {}", e.without_url()))
            })?;
            downloaded = downloaded.saturating_add(chunk.len() as u64);
            if downloaded > self.max_archive_bytes {
                return Err(HubError::FetchFailed(format!(
                    "archive exceeds the {} byte limit",
                    self.max_archive_bytes
                )));
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }

    async fn create_staging_dir(&self) -> HubResult<tempfile::TempDir> {
        let created = match tokio::fs::create_dir_all(&self.staging_dir).await {
            Ok(()) => tempfile::Builder::new()
                .prefix("patchhub-")
                .tempdir_in(&self.staging_dir),
            Err(e) => Err(e),
        };
        created.map_err(|e| {
            warn!(error = %e, "failed to create staging area");
            HubError::FetchFailed("failed to create staging area".into())
        })
    }

    async fn fetch_from(&self, start: &url::Url, timeout: Duration) -> HubResult<Staging> {
        let data = tokio::time::timeout(timeout, self.download(start))
            .await
            .map_err(|_| {
                HubError::FetchFailed(format!("download timed out after {timeout:?}"))
            })??;

        let dir = self.create_staging_dir().await?;
        let dest = dir.path().to_path_buf();
        let limits = self.limits;
        let source = tokio::task::spawn_blocking(move || extract_zip(&data, &dest, limits))
            .await
            .map_err(|e| HubError::FetchFailed(format!("extraction task failed: {e}")))??;

        Ok(Staging::owned(dir, source))
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch_and_extract(&self, url: &ArchiveUrl, timeout: Duration) -> HubResult<Staging> {
        debug!(identifier = %url.identifier(), branch = %url.branch(), "downloading archive");
        self.fetch_from(url.url(), timeout).await
    }
}

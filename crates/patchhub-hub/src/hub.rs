//! The orchestrator: rate limiting, caching and delegation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::artifact::ArtifactKind;
use crate::cache::ResultCache;
use crate::clock::{Clock, SystemClock};
use crate::error::{HubError, HubResult};
use crate::installer::{DEFAULT_FETCH_TIMEOUT, InstallOutcome, SecureInstaller};
use crate::ports::{ArchiveFetcher, DirectoryMover, InstallFinalizer};
use crate::rate_limit::{Operation, RateLimiter};
use crate::registry::{RegistrySearch, SearchQuery};
use crate::render::SearchPayload;
use crate::validate::UrlValidator;

/// Default publisher organization.
pub const DEFAULT_PUBLISHER_ORG: &str = "Sudo-WP";

/// Tunables injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSettings {
    /// Organization every search and install is scoped to.
    pub publisher_org: String,
    /// Seconds between searches per caller.
    pub search_window_secs: u64,
    /// Seconds between installs per caller.
    pub install_window_secs: u64,
    /// Seconds a rendered search stays cached.
    pub cache_ttl_secs: u64,
    /// Overall archive download timeout.
    pub fetch_timeout: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            publisher_org: DEFAULT_PUBLISHER_ORG.to_owned(),
            search_window_secs: 2,
            install_window_secs: 10,
            cache_ttl_secs: 300,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Search and install entry point. `Send + Sync`; share it behind an `Arc`.
pub struct Hub {
    settings: HubSettings,
    registry: Arc<dyn RegistrySearch>,
    limiter: RateLimiter,
    cache: ResultCache,
    installer: SecureInstaller,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("settings", &self.settings)
            .field("limiter", &self.limiter)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Hub`].
pub struct HubBuilder {
    settings: HubSettings,
    clock: Arc<dyn Clock>,
    registry: Arc<dyn RegistrySearch>,
    fetcher: Arc<dyn ArchiveFetcher>,
    mover: Arc<dyn DirectoryMover>,
    finalizer: Arc<dyn InstallFinalizer>,
}

impl HubBuilder {
    /// Use a specific clock for cache and rate-limit expiry.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the settings.
    #[must_use]
    pub fn settings(mut self, settings: HubSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the hub.
    #[must_use]
    pub fn build(self) -> Hub {
        let installer = SecureInstaller::new(
            UrlValidator::new(self.settings.publisher_org.clone()),
            self.fetcher,
            self.mover,
            self.finalizer,
        )
        .with_fetch_timeout(self.settings.fetch_timeout);

        Hub {
            limiter: RateLimiter::new(self.clock.clone()),
            cache: ResultCache::new(self.clock),
            settings: self.settings,
            registry: self.registry,
            installer,
        }
    }
}

impl Hub {
    /// Start building a hub from its collaborators.
    #[must_use]
    pub fn builder(
        registry: Arc<dyn RegistrySearch>,
        fetcher: Arc<dyn ArchiveFetcher>,
        mover: Arc<dyn DirectoryMover>,
        finalizer: Arc<dyn InstallFinalizer>,
    ) -> HubBuilder {
        HubBuilder {
            settings: HubSettings::default(),
            clock: Arc::new(SystemClock),
            registry,
            fetcher,
            mover,
            finalizer,
        }
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    /// Search the publisher organization and return the rendered payload.
    ///
    /// # Errors
    ///
    /// [`HubError::TooManyRequests`] inside the caller's search window, or
    /// the registry errors. Errors are never cached.
    pub async fn search(
        &self,
        identity: &str,
        term: &str,
        kind: ArtifactKind,
    ) -> HubResult<String> {
        if !self
            .limiter
            .allow(identity, Operation::Search, self.settings.search_window_secs)
        {
            debug!(identity, "search rate limited");
            return Err(HubError::TooManyRequests);
        }

        let query = SearchQuery::new(term, kind, self.settings.publisher_org.clone());
        let fingerprint = query.fingerprint();
        if let Some(payload) = self.cache.get(&fingerprint) {
            debug!(%fingerprint, "search cache hit");
            return Ok(payload);
        }

        let items = self.registry.search(&query).await.map_err(|e| {
            warn!(error = %e, "registry search failed");
            HubError::from(e)
        })?;
        let payload =
            SearchPayload::from_items(&items, kind, &self.settings.publisher_org).to_json()?;
        self.cache
            .put(&fingerprint, payload.clone(), self.settings.cache_ttl_secs);
        Ok(payload)
    }

    /// Install an artifact from a validated archive URL.
    ///
    /// # Errors
    ///
    /// [`HubError::TooManyRequests`] inside the caller's install window,
    /// otherwise whatever [`SecureInstaller::install`] returns.
    pub async fn install(
        &self,
        identity: &str,
        url: &str,
        identifier: &str,
        kind: ArtifactKind,
    ) -> HubResult<InstallOutcome> {
        if !self
            .limiter
            .allow(identity, Operation::Install, self.settings.install_window_secs)
        {
            debug!(identity, "install rate limited");
            return Err(HubError::TooManyRequests);
        }
        self.installer.install(url, identifier, kind).await
    }
}

//! Wiring from a resolved config to a ready [`HubService`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use patchhub_config::{Config, ResolvedConfig};
use patchhub_hub::registry::DEFAULT_USER_AGENT;
use patchhub_hub::{
    AllowList, DirectoryFinalizer, FileCredentialStore, FsMover, GithubRegistryClient, Hub,
    HubService, HubSettings, HttpArchiveFetcher,
};
use patchhub_telemetry::{LogConfig, LogFormat};

/// Scratch directory under the install root. Keeping it on the same
/// filesystem lets the final move be a plain rename.
const STAGING_DIR: &str = ".staging";

/// Everything a command needs.
pub(crate) struct HubContext {
    pub(crate) service: HubService,
    pub(crate) credentials: Arc<FileCredentialStore>,
    pub(crate) identity: String,
}

/// Name the local user acts under.
pub(crate) fn local_identity() -> String {
    ["PATCHHUB_IDENTITY", "USER", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "local".to_owned())
}

/// Access policy for the CLI. An empty installer list grants the local user.
pub(crate) fn access_policy(config: &Config, identity: &str) -> AllowList {
    if config.access.installers.is_empty() {
        AllowList::new([identity])
    } else {
        AllowList::new(config.access.installers.iter().cloned())
    }
}

pub(crate) fn credential_store(resolved: &ResolvedConfig) -> FileCredentialStore {
    FileCredentialStore::new(resolved.credentials_path())
        .with_fallback(resolved.config.registry.token.clone())
}

pub(crate) fn hub_settings(config: &Config) -> HubSettings {
    HubSettings {
        publisher_org: config.registry.publisher_org.clone(),
        search_window_secs: config.limits.search_window_secs,
        install_window_secs: config.limits.install_window_secs,
        cache_ttl_secs: config.cache.ttl_secs,
        fetch_timeout: Duration::from_secs(config.install.fetch_timeout_secs),
    }
}

impl HubContext {
    pub(crate) fn build(resolved: &ResolvedConfig) -> Result<Self> {
        let config = &resolved.config;
        let user_agent = config
            .registry
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT);

        let credentials = Arc::new(credential_store(resolved));
        let registry = GithubRegistryClient::with_options(
            &config.registry.api_base,
            user_agent,
            Duration::from_secs(config.registry.request_timeout_secs),
        )
        .context("failed to create registry client")?
        .with_credentials(credentials.clone());

        let install_root = resolved.install_root();
        let fetcher = HttpArchiveFetcher::with_user_agent(install_root.join(STAGING_DIR), user_agent)
            .context("failed to create archive fetcher")?
            .with_allowed_hosts(config.install.allowed_redirect_hosts.clone())
            .with_max_size(config.install.max_archive_bytes);

        let hub = Hub::builder(
            Arc::new(registry),
            Arc::new(fetcher),
            Arc::new(FsMover),
            Arc::new(DirectoryFinalizer::new(&install_root)),
        )
        .settings(hub_settings(config))
        .build();

        let identity = local_identity();
        let access = access_policy(config, &identity);
        tracing::debug!(%identity, root = %install_root.display(), "hub ready");

        Ok(Self {
            service: HubService::new(Arc::new(hub), Arc::new(access)),
            credentials,
            identity,
        })
    }
}

/// Logging config from the `[logging]` section. `--verbose` forces `debug`.
pub(crate) fn to_log_config(config: &Config, verbose: bool) -> LogConfig {
    let format = config
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    config
        .logging
        .directives
        .iter()
        .fold(
            LogConfig::new(level).with_format(format),
            |lc, directive| lc.with_directive(directive.clone()),
        )
}

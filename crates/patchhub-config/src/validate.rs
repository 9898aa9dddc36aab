//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const MAX_ORG_LEN: usize = 39;
const MAX_WINDOW_SECS: u64 = 3_600;
const MAX_CACHE_TTL_SECS: u64 = 86_400;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;
const MAX_FETCH_TIMEOUT_SECS: u64 = 3_600;
const MAX_ARCHIVE_BYTES: u64 = 1_073_741_824;

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_registry(config)?;
    validate_limits(config)?;
    validate_install(config)?;
    validate_access(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn in_range(field: &str, value: u64, max: u64) -> ConfigResult<()> {
    if value == 0 || value > max {
        return Err(invalid(
            field,
            format!("{value} is out of range; must be between 1 and {max}"),
        ));
    }
    Ok(())
}

/// GitHub organization names: ASCII alphanumerics and single inner hyphens.
fn is_valid_org(org: &str) -> bool {
    !org.is_empty()
        && org.len() <= MAX_ORG_LEN
        && org.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !org.starts_with('-')
        && !org.ends_with('-')
        && !org.contains("--")
}

fn validate_registry(config: &Config) -> ConfigResult<()> {
    let r = &config.registry;
    if !is_valid_org(&r.publisher_org) {
        return Err(invalid(
            "registry.publisher_org",
            format!("'{}' is not a valid organization name", r.publisher_org),
        ));
    }

    let base = url::Url::parse(&r.api_base)
        .map_err(|e| invalid("registry.api_base", format!("not a URL: {e}")))?;
    let loopback = matches!(
        base.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]")
    );
    match base.scheme() {
        "https" => {},
        "http" if loopback => {},
        other => {
            return Err(invalid(
                "registry.api_base",
                format!("scheme '{other}' not allowed; use https"),
            ));
        },
    }

    if let Some(agent) = &r.user_agent
        && agent.trim().is_empty()
    {
        return Err(invalid("registry.user_agent", "must not be blank"));
    }

    in_range(
        "registry.request_timeout_secs",
        r.request_timeout_secs,
        MAX_REQUEST_TIMEOUT_SECS,
    )
}

fn validate_limits(config: &Config) -> ConfigResult<()> {
    in_range(
        "limits.search_window_secs",
        config.limits.search_window_secs,
        MAX_WINDOW_SECS,
    )?;
    in_range(
        "limits.install_window_secs",
        config.limits.install_window_secs,
        MAX_WINDOW_SECS,
    )?;
    in_range("cache.ttl_secs", config.cache.ttl_secs, MAX_CACHE_TTL_SECS)
}

fn validate_install(config: &Config) -> ConfigResult<()> {
    let i = &config.install;
    in_range(
        "install.fetch_timeout_secs",
        i.fetch_timeout_secs,
        MAX_FETCH_TIMEOUT_SECS,
    )?;
    in_range(
        "install.max_archive_bytes",
        i.max_archive_bytes,
        MAX_ARCHIVE_BYTES,
    )?;

    if i.allowed_redirect_hosts.is_empty() {
        return Err(invalid(
            "install.allowed_redirect_hosts",
            "at least one host is required",
        ));
    }
    for host in &i.allowed_redirect_hosts {
        if host.is_empty() || host.contains(['/', ':', '@', ' ']) {
            return Err(invalid(
                "install.allowed_redirect_hosts",
                format!("'{host}' is not a bare host name"),
            ));
        }
    }

    if let Some(root) = &i.root
        && root.as_os_str().is_empty()
    {
        return Err(invalid("install.root", "must not be empty"));
    }
    Ok(())
}

fn validate_access(config: &Config) -> ConfigResult<()> {
    if config
        .access
        .installers
        .iter()
        .any(|id| id.trim().is_empty())
    {
        return Err(invalid("access.installers", "identities must not be blank"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: error, warn, info, debug, trace",
                l.level
            ),
        ));
    }
    if !matches!(
        l.format.to_ascii_lowercase().as_str(),
        "pretty" | "compact" | "json"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        ));
    }
    Ok(())
}

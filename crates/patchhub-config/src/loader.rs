//! Config discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`.
//! 2. Merge `/etc/patchhub/config.toml`.
//! 3. Merge `{home}/config.toml` where home is `~/.patchhub` or an override.
//! 4. Fill unset fields from environment variables.
//! 5. Deserialize and validate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge, record_leaves};
use crate::show::{ResolvedConfig, user_config_path};
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/patchhub/config.toml";

/// Largest config file accepted (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the layered configuration.
///
/// `home_override` replaces `~/.patchhub` as the directory holding the user
/// config, credentials and default install root.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, if no
/// home directory can be found, or if validation fails.
pub fn load(home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let home = match home_override {
        Some(h) => h.to_path_buf(),
        None => default_home()?,
    };
    load_layers(Path::new(SYSTEM_CONFIG_PATH), &home, &collect_env_vars())
}

pub(crate) fn load_layers(
    system_path: &Path,
    home: &Path,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut field_sources = FieldSources::new();
    record_leaves(&merged, "", ConfigLayer::Defaults, &mut field_sources);

    let mut loaded_files = Vec::new();
    let user_path = user_config_path(home);
    for (path, layer) in [
        (system_path.to_path_buf(), ConfigLayer::System),
        (user_path, ConfigLayer::User),
    ] {
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge(&mut merged, &overlay, "", layer, &mut field_sources);
            info!(path = %path.display(), %layer, "loaded config file");
            loaded_files.push(path.display().to_string());
        }
    }

    let applied = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if applied > 0 {
        debug!(count = applied, "applied environment variable fallbacks");
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
        home: home.to_path_buf(),
    })
}

/// Load a single file with no layering or env fallbacks.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, too large, malformed, or
/// fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let Some(value) = try_load_file(path)? else {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    };
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a file, or `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}

/// `~/.patchhub`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the platform reports no home.
pub fn default_home() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".patchhub"))
        .ok_or(ConfigError::NoHomeDir)
}

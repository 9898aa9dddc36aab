//! Layered configuration for PatchHub.
//!
//! Values come from, lowest precedence first: the embedded defaults,
//! `/etc/patchhub/config.toml`, `~/.patchhub/config.toml`, then environment
//! variables for anything no file set. The merged result is validated before
//! it is returned.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod show;
mod types;
mod validate;

pub use env::known_env_vars;
pub use error::{ConfigError, ConfigResult};
pub use loader::{MAX_CONFIG_FILE_SIZE, SYSTEM_CONFIG_PATH, default_home, load_file};
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load with the full precedence chain and the default home.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any layer is malformed or the result
    /// fails validation.
    pub fn load() -> ConfigResult<ResolvedConfig> {
        loader::load(None)
    }

    /// Load with `home` in place of `~/.patchhub`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any layer is malformed or the result
    /// fails validation.
    pub fn load_with_home(home: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load(Some(home))
    }

    /// Check this configuration's values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::ValidationError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}

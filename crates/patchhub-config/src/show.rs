//! `config show` rendering with per-field source annotations.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::merge::{FieldSources, join_path};
use crate::types::Config;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Files merged, lowest precedence first.
    pub loaded_files: Vec<String>,
    /// PatchHub home (`~/.patchhub` unless overridden).
    pub home: PathBuf,
}

/// Output format for [`ResolvedConfig::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with source comments.
    Toml,
    /// Plain JSON.
    Json,
}

impl ResolvedConfig {
    /// Install root, falling back to `installs/` inside [`Self::home`].
    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        self.config
            .install
            .root
            .clone()
            .unwrap_or_else(|| self.home.join("installs"))
    }

    /// Credentials file inside [`Self::home`].
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.home.join("credentials.toml")
    }

    /// User config file inside [`Self::home`].
    #[must_use]
    pub fn user_config_path(&self) -> PathBuf {
        user_config_path(&self.home)
    }

    /// Render the configuration. The token is never included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn show(&self, format: ShowFormat) -> Result<String, fmt::Error> {
        match format {
            ShowFormat::Json => serde_json::to_string_pretty(&self.config).map_err(|_| fmt::Error),
            ShowFormat::Toml => self.show_toml(),
        }
    }

    fn show_toml(&self) -> Result<String, fmt::Error> {
        let body = toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?;
        let mut output = String::from("# Resolved PatchHub configuration\n");
        if !self.loaded_files.is_empty() {
            output.push_str("# Loaded files:\n");
            for path in &self.loaded_files {
                writeln!(output, "#   {path}")?;
            }
        }
        if self.config.registry.token.is_some() {
            let source = self
                .field_sources
                .get("registry.token")
                .map_or_else(String::new, |layer| format!(" [{layer}]"));
            writeln!(output, "# Token: set{source}")?;
        }
        output.push('\n');

        let mut section = String::new();
        for line in body.lines() {
            let trimmed = line.trim();
            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                section = name.to_owned();
            }
            match self.annotation(trimmed, &section) {
                Some(note) => writeln!(output, "{line}  # [{note}]")?,
                None => writeln!(output, "{line}")?,
            }
        }
        Ok(output)
    }

    fn annotation(&self, trimmed: &str, section: &str) -> Option<String> {
        if trimmed.is_empty() || trimmed.starts_with(['#', '[']) {
            return None;
        }
        let (key, _) = trimmed.split_once('=')?;
        self.field_sources
            .get(&join_path(section, key.trim()))
            .map(ToString::to_string)
    }
}

/// `config.toml` inside a PatchHub home.
#[must_use]
pub fn user_config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

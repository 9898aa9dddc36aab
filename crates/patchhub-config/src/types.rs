//! Configuration schema.
//!
//! Every section uses `#[serde(default)]` so a partial file only overrides the
//! keys it names.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream search API.
    pub registry: RegistrySection,
    /// Per-caller rate limits.
    pub limits: LimitsSection,
    /// Search result cache.
    pub cache: CacheSection,
    /// Download and install.
    pub install: InstallSection,
    /// Who may search and install.
    pub access: AccessSection,
    /// Log output.
    pub logging: LoggingSection,
}

/// `[registry]`
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Organization every search and install is scoped to.
    pub publisher_org: String,
    /// Search API base URL.
    pub api_base: String,
    /// `User-Agent` override.
    pub user_agent: Option<String>,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Personal access token. Never serialized.
    pub token: Option<String>,
}

impl std::fmt::Debug for RegistrySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySection")
            .field("publisher_org", &self.publisher_org)
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl Serialize for RegistrySection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RegistrySection", 4)?;
        state.serialize_field("publisher_org", &self.publisher_org)?;
        state.serialize_field("api_base", &self.api_base)?;
        if let Some(agent) = &self.user_agent {
            state.serialize_field("user_agent", agent)?;
        } else {
            state.skip_field("user_agent")?;
        }
        state.serialize_field("request_timeout_secs", &self.request_timeout_secs)?;
        state.end()
    }
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            publisher_org: "Sudo-WP".to_owned(),
            api_base: "https://api.github.com".to_owned(),
            user_agent: None,
            request_timeout_secs: 15,
            token: None,
        }
    }
}

/// `[limits]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    /// Seconds between searches per caller.
    pub search_window_secs: u64,
    /// Seconds between installs per caller.
    pub install_window_secs: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            search_window_secs: 2,
            install_window_secs: 10,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Seconds a rendered search stays cached.
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// `[install]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Install root. `plugins/` and `themes/` live under it.
    /// Defaults to `installs/` inside the PatchHub home.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Overall download timeout.
    pub fetch_timeout_secs: u64,
    /// Largest archive accepted, in bytes.
    pub max_archive_bytes: u64,
    /// Hosts a download may redirect to.
    pub allowed_redirect_hosts: Vec<String>,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            root: None,
            fetch_timeout_secs: 60,
            max_archive_bytes: 50_000_000,
            allowed_redirect_hosts: vec![
                "github.com".to_owned(),
                "codeload.github.com".to_owned(),
            ],
        }
    }
}

/// `[access]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSection {
    /// Identities holding the install capability. `"*"` admits everyone.
    pub installers: Vec<String>,
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    /// Extra per-module directives.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

//! Artifact identity types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};

/// Maximum identifier length. Matches GitHub's repository name limit.
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// Maximum branch name length accepted in archive URLs.
pub const MAX_BRANCH_LEN: usize = 255;

/// Name of a package under the publisher organization.
///
/// Identifiers are used both as labels and as filesystem path components, so
/// they are restricted to `[A-Za-z0-9_-]`, 1 to [`MAX_IDENTIFIER_LEN`] bytes.
/// Dots are excluded, which rules out `.` and `..` outright.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactId(String);

/// Deserialize with validation so crafted payloads cannot smuggle a
/// traversal sequence past the constructor.
impl<'de> Deserialize<'de> for ArtifactId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl ArtifactId {
    /// Create a new `ArtifactId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidSource`] if the identifier is empty, too
    /// long, or contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> HubResult<Self> {
        let id = id.into();
        Self::validate(&id).map_err(HubError::InvalidSource)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid identifier without constructing one.
    #[must_use]
    pub fn is_valid(id: &str) -> bool {
        Self::validate(id).is_ok()
    }

    fn validate(id: &str) -> Result<(), String> {
        if id.is_empty() {
            return Err("identifier must not be empty".into());
        }
        if id.len() > MAX_IDENTIFIER_LEN {
            return Err(format!(
                "identifier must be at most {MAX_IDENTIFIER_LEN} characters"
            ));
        }
        if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
        {
            return Err(
                "identifier may contain only letters, digits, hyphens and underscores".into(),
            );
        }
        Ok(())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A git branch name that is safe to embed in an archive URL and to use as
/// part of an extracted folder name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BranchName(String);

impl<'de> Deserialize<'de> for BranchName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl BranchName {
    /// Create a new `BranchName`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidSource`] if the name is not branch-safe.
    pub fn new(name: impl Into<String>) -> HubResult<Self> {
        let name = name.into();
        Self::validate(&name).map_err(HubError::InvalidSource)?;
        Ok(Self(name))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid branch name without constructing one.
    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        Self::validate(name).is_ok()
    }

    /// Single path segment only: no `/`, no `..`, no leading `.` or `-`.
    fn validate(name: &str) -> Result<(), String> {
        if name.is_empty() || name.len() > MAX_BRANCH_LEN {
            return Err(format!("branch must be 1-{MAX_BRANCH_LEN} characters"));
        }
        let is_valid = name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
        if !is_valid {
            return Err("branch contains invalid characters".into());
        }
        if name.starts_with('.')
            || name.starts_with('-')
            || name.ends_with('.')
            || name.contains("..")
            || std::path::Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("lock"))
        {
            return Err("branch has invalid format".into());
        }
        Ok(())
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of artifact is being searched for or installed.
///
/// The kind only routes the post-install step and the activation hint. It is
/// declared by the caller and not cross-checked against registry metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A plugin.
    #[default]
    Plugin,
    /// A theme.
    Theme,
}

impl ArtifactKind {
    /// Lowercase name used in queries, payloads and folder routing.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }

    /// Host surface where a freshly installed artifact of this kind is
    /// activated.
    #[must_use]
    pub fn activation_surface(self) -> &'static str {
        match self {
            Self::Plugin => "plugins",
            Self::Theme => "themes",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plugin" => Ok(Self::Plugin),
            "theme" => Ok(Self::Theme),
            other => Err(HubError::InvalidSource(format!(
                "unknown artifact kind '{other}', expected 'plugin' or 'theme'"
            ))),
        }
    }
}

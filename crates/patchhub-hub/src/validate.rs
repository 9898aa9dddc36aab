//! Download URL validation.
//!
//! An archive URL is only ever accepted in exactly one spelling:
//!
//! ```text
//! https://github.com/{org}/{identifier}/archive/refs/heads/{branch}.zip
//! ```
//!
//! The URL is parsed and its serialization must equal the input byte for
//! byte, which rejects every alternate form a parser would normalize away
//! (upper-case host, explicit `:443`, dot segments, backslashes, encoded
//! traversal). After that the components are compared structurally.

use std::fmt;

use tracing::warn;

use crate::artifact::{ArtifactId, BranchName};

/// The only host archive URLs may point at.
pub const REGISTRY_HOST: &str = "github.com";

/// Path segment between the identifier and the branch file name.
const ARCHIVE_INFIX: &str = "archive/refs/heads";

/// Why a URL was rejected. Only used for logging; callers see a plain
/// invalid-source error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The identifier is not a valid artifact identifier.
    #[error("identifier is not valid")]
    InvalidIdentifier,
    /// The input does not parse as an absolute URL.
    #[error("not a URL")]
    Unparseable,
    /// The parser's serialization differs from the input.
    #[error("URL is not in canonical form")]
    NotCanonical,
    /// Scheme other than `https`.
    #[error("scheme must be https")]
    Scheme,
    /// Username or password present.
    #[error("URL must not carry credentials")]
    Userinfo,
    /// Explicit port present.
    #[error("URL must not carry a port")]
    Port,
    /// Query string present, even an empty one.
    #[error("URL must not carry a query")]
    Query,
    /// Fragment present, even an empty one.
    #[error("URL must not carry a fragment")]
    Fragment,
    /// Host other than [`REGISTRY_HOST`].
    #[error("host is not allowed")]
    Host,
    /// Path does not point at this identifier's branch archives.
    #[error("path does not match the publisher archive layout")]
    Path,
    /// The branch file name is missing, malformed or not a `.zip`.
    #[error("branch archive name is not valid")]
    Branch,
}

/// A download URL that passed validation, along with the parts it was
/// checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveUrl {
    url: url::Url,
    identifier: ArtifactId,
    branch: BranchName,
}

impl ArchiveUrl {
    /// Build the archive URL for a branch from already-validated parts.
    ///
    /// `org` must itself be a valid publisher organization name; the config
    /// layer enforces that before a hub is built.
    #[must_use]
    pub fn for_branch(org: &str, identifier: &ArtifactId, branch: &BranchName) -> String {
        format!("https://{REGISTRY_HOST}/{org}/{identifier}/{ARCHIVE_INFIX}/{branch}.zip")
    }

    /// The URL as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The parsed URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Identifier the URL was validated for.
    #[must_use]
    pub fn identifier(&self) -> &ArtifactId {
        &self.identifier
    }

    /// Branch named by the archive file.
    #[must_use]
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }
}

impl fmt::Display for ArchiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Decides whether a proposed download URL is an allowed archive URL for a
/// given identifier under the publisher organization.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    org: String,
}

impl UrlValidator {
    /// Create a validator for the given publisher organization.
    #[must_use]
    pub fn new(org: impl Into<String>) -> Self {
        Self { org: org.into() }
    }

    /// Publisher organization this validator is bound to.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Total, side-effect free accept/reject decision.
    #[must_use]
    pub fn validate(&self, url: &str, identifier: &str) -> bool {
        self.check(url, identifier).is_ok()
    }

    /// Like [`validate`](Self::validate) but returns the accepted URL or the
    /// reason for rejection.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] encountered.
    pub fn check(&self, url: &str, identifier: &str) -> Result<ArchiveUrl, Rejection> {
        let identifier = ArtifactId::new(identifier).map_err(|_| Rejection::InvalidIdentifier)?;

        let parsed = url::Url::parse(url).map_err(|_| Rejection::Unparseable)?;
        if parsed.as_str() != url {
            return Err(Rejection::NotCanonical);
        }
        if parsed.scheme() != "https" {
            return Err(Rejection::Scheme);
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(Rejection::Userinfo);
        }
        if parsed.port().is_some() {
            return Err(Rejection::Port);
        }
        if parsed.query().is_some() {
            return Err(Rejection::Query);
        }
        if parsed.fragment().is_some() {
            return Err(Rejection::Fragment);
        }
        if parsed.host_str() != Some(REGISTRY_HOST) {
            return Err(Rejection::Host);
        }

        let prefix = format!("/{}/{identifier}/{ARCHIVE_INFIX}/", self.org);
        let file = parsed
            .path()
            .strip_prefix(prefix.as_str())
            .ok_or(Rejection::Path)?;
        let branch = file
            .strip_suffix(".zip")
            .filter(|b| !b.contains('/'))
            .ok_or(Rejection::Branch)?;
        let branch = BranchName::new(branch).map_err(|_| Rejection::Branch)?;

        Ok(ArchiveUrl {
            url: parsed,
            identifier,
            branch,
        })
    }

    /// [`check`](Self::check), logging the rejection reason.
    pub(crate) fn check_logged(&self, url: &str, identifier: &str) -> Option<ArchiveUrl> {
        match self.check(url, identifier) {
            Ok(archive) => Some(archive),
            Err(reason) => {
                warn!(%reason, identifier, "rejected archive URL");
                None
            },
        }
    }
}

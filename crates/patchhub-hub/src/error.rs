//! Hub error types.
//!
//! Every message is safe to show to the caller: no filesystem paths, no
//! credentials, no upstream bodies. Details belong in `tracing` output.

/// Errors from hub operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The caller lacks the install capability.
    #[error("permission denied")]
    PermissionDenied,

    /// The caller's rate-limit window for this operation is still open.
    #[error("too many requests, please wait a moment and try again")]
    TooManyRequests,

    /// The download URL or identifier failed validation.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// The registry could not be reached or timed out.
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The registry refused the request because of its own rate limit.
    #[error("registry rate limit exceeded; configure a GitHub token to raise the limit")]
    RateLimitedByUpstream,

    /// The registry answered with something we could not interpret.
    #[error("unexpected registry response: {0}")]
    UnexpectedSchema(String),

    /// Downloading or extracting the archive failed.
    #[error("download failed: {0}")]
    FetchFailed(String),

    /// Moving the extracted folder to its canonical name failed.
    #[error("could not move the extracted archive into place")]
    RenameFailed,

    /// The artifact is already present at its install location.
    #[error("destination folder already exists: {0}")]
    AlreadyInstalled(String),

    /// The host refused the final install step for lack of permissions.
    #[error("filesystem permission denied while installing")]
    FilesystemPermissionDenied,

    /// The final install step failed for another reason.
    #[error("installation failed: {0}")]
    InstallFailed(String),

    /// Reading or writing the credential store failed.
    #[error("credential store error: {0}")]
    Credentials(String),
}

impl HubError {
    /// Stable machine-readable code for tagged response payloads.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::TooManyRequests => "too_many_requests",
            Self::InvalidSource(_) => "invalid_source",
            Self::RegistryUnavailable(_) => "registry_unavailable",
            Self::RateLimitedByUpstream => "rate_limited_by_upstream",
            Self::UnexpectedSchema(_) => "unexpected_schema",
            Self::FetchFailed(_) => "fetch_failed",
            Self::RenameFailed => "rename_failed",
            Self::AlreadyInstalled(_) => "already_installed",
            Self::FilesystemPermissionDenied => "filesystem_permission_denied",
            Self::InstallFailed(_) => "install_failed",
            Self::Credentials(_) => "credentials",
        }
    }
}

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_rate_limit_message_mentions_token() {
        let msg = HubError::RateLimitedByUpstream.to_string();
        assert!(msg.contains("token"));
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            HubError::PermissionDenied,
            HubError::TooManyRequests,
            HubError::InvalidSource(String::new()),
            HubError::RegistryUnavailable(String::new()),
            HubError::RateLimitedByUpstream,
            HubError::UnexpectedSchema(String::new()),
            HubError::FetchFailed(String::new()),
            HubError::RenameFailed,
            HubError::AlreadyInstalled(String::new()),
            HubError::FilesystemPermissionDenied,
            HubError::InstallFailed(String::new()),
            HubError::Credentials(String::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(HubError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}

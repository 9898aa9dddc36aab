//! PatchHub core: search a trusted publisher organization's repositories and
//! install their branch archives safely.
//!
//! The pieces, leaves first:
//!
//! - [`RateLimiter`] bounds how often a caller may search or install.
//! - [`ResultCache`] memoizes rendered search payloads.
//! - [`GithubRegistryClient`] queries the search API and filters the answer
//!   into typed [`SearchResultItem`]s.
//! - [`UrlValidator`] accepts a download URL only in its one canonical form.
//! - [`SecureInstaller`] runs validate, fetch, rename and finalize.
//! - [`Hub`] ties them together; [`HubService`] adds the capability check
//!   and tagged responses.
//!
//! Filesystem, network, access policy and credential storage are reached
//! through the traits in [`ports`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod access;
pub mod artifact;
pub mod cache;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod finalize;
pub mod fs_move;
pub mod hub;
pub mod installer;
pub mod ports;
pub mod rate_limit;
pub mod registry;
pub mod render;
pub mod surface;
pub mod validate;

pub use access::AllowList;
pub use artifact::{ArtifactId, ArtifactKind, BranchName};
pub use cache::ResultCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{FileCredentialStore, TOKEN_MASK, mask_token, normalize_token};
pub use error::{HubError, HubResult};
pub use fetch::{ExtractLimits, HttpArchiveFetcher};
pub use finalize::DirectoryFinalizer;
pub use fs_move::FsMover;
pub use hub::{DEFAULT_PUBLISHER_ORG, Hub, HubBuilder, HubSettings};
pub use installer::{InstallOutcome, SecureInstaller};
pub use ports::{
    ArchiveFetcher, CapabilityCheck, CredentialStore, DirectoryMover, FinalizeOutcome,
    InstallFinalizer, Staging,
};
pub use rate_limit::{Operation, RateLimiter};
pub use registry::{
    GithubRegistryClient, RegistryError, RegistrySearch, SearchQuery, SearchResultItem,
};
pub use render::{Card, EMPTY_RESULTS_MESSAGE, SearchPayload};
pub use surface::{HubService, InstallRequest, Response, SearchRequest};
pub use validate::{ArchiveUrl, Rejection, UrlValidator};

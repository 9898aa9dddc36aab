//! Fixtures for registry responses and archive URLs.

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use patchhub_hub::{ArchiveUrl, ArtifactId, BranchName, SearchResultItem};

/// Publisher organization used throughout the fixtures.
pub const TEST_ORG: &str = "Sudo-WP";

/// A well-formed repository object as the search API returns it.
#[must_use]
pub fn search_item_json(name: &str) -> Value {
    json!({
        "id": 1,
        "name": name,
        "full_name": format!("{TEST_ORG}/{name}"),
        "html_url": format!("https://github.com/{TEST_ORG}/{name}"),
        "description": format!("Patched build of {name}"),
        "fork": false,
        "default_branch": "main",
        "stargazers_count": 12,
        "updated_at": "2024-05-01T08:15:00Z",
        "owner": { "login": TEST_ORG }
    })
}

/// A full search response body with one item per name.
#[must_use]
pub fn search_response_json(names: &[&str]) -> String {
    let items: Vec<Value> = names.iter().map(|n| search_item_json(n)).collect();
    json!({
        "total_count": items.len(),
        "incomplete_results": false,
        "items": items
    })
    .to_string()
}

/// The body GitHub sends when its rate limit is hit.
#[must_use]
pub fn rate_limited_response_json() -> String {
    json!({
        "message": "API rate limit exceeded for 203.0.113.7.",
        "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api"
    })
    .to_string()
}

/// A parsed result item matching [`search_item_json`].
///
/// # Panics
///
/// Panics if `name` is not a valid identifier.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn result_item(name: &str) -> SearchResultItem {
    SearchResultItem {
        identifier: ArtifactId::new(name).unwrap(),
        description: Some(format!("Patched build of {name}")),
        page_url: format!("https://github.com/{TEST_ORG}/{name}"),
        default_branch: BranchName::new("main").unwrap(),
        stars: 12,
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 15, 0).unwrap(),
    }
}

/// The canonical archive URL for `name` on `branch`.
///
/// # Panics
///
/// Panics if `name` or `branch` is invalid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn archive_url(name: &str, branch: &str) -> String {
    ArchiveUrl::for_branch(
        TEST_ORG,
        &ArtifactId::new(name).unwrap(),
        &BranchName::new(branch).unwrap(),
    )
}

/// Initialize a test tracing subscriber. Safe to call more than once.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

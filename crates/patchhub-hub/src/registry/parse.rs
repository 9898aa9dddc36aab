//! Search response parsing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{RegistryError, SearchResultItem};
use crate::artifact::{ArtifactId, BranchName};
use crate::validate::REGISTRY_HOST;

/// Descriptions longer than this are truncated, in characters.
const MAX_DESCRIPTION_LEN: usize = 512;

/// The subset of a repository object we read. Everything else is ignored.
#[derive(Deserialize)]
struct RawItem {
    name: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    default_branch: String,
    stargazers_count: u64,
    updated_at: String,
}

/// Shown when the body lacks `items`, which is how GitHub answers anonymous
/// callers that have exhausted their quota.
pub const MISSING_ITEMS_MESSAGE: &str =
    "no results list in the response (often an exhausted anonymous quota); configure a GitHub token";

/// Parse a search response body into validated items.
///
/// The body must be a JSON object with an `items` array. Each element is
/// checked on its own; one that fails any check is logged and skipped
/// without affecting the others.
///
/// # Errors
///
/// Returns [`RegistryError::UnexpectedSchema`] if the body is not JSON or
/// has no `items` array.
pub fn parse_search_response(
    body: &[u8],
    publisher_org: &str,
) -> Result<Vec<SearchResultItem>, RegistryError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| RegistryError::UnexpectedSchema("response is not JSON".into()))?;

    let items = value
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| RegistryError::UnexpectedSchema(MISSING_ITEMS_MESSAGE.into()))?;

    let parsed = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match parse_item(item, publisher_org) {
            Ok(item) => Some(item),
            Err(reason) => {
                debug!(index, reason, "skipping registry item");
                None
            },
        })
        .collect();
    Ok(parsed)
}

fn parse_item(item: &Value, publisher_org: &str) -> Result<SearchResultItem, &'static str> {
    let raw = RawItem::deserialize(item).map_err(|_| "missing or mistyped field")?;

    let identifier = ArtifactId::new(raw.name).map_err(|_| "invalid name")?;

    let expected_page = format!("https://{REGISTRY_HOST}/{publisher_org}/{identifier}");
    if raw.html_url != expected_page {
        return Err("page URL is outside the publisher organization");
    }

    let default_branch = BranchName::new(raw.default_branch).map_err(|_| "invalid branch")?;

    let updated_at = DateTime::parse_from_rfc3339(&raw.updated_at)
        .map_err(|_| "invalid timestamp")?
        .with_timezone(&Utc);

    let description = raw.description.as_deref().and_then(clean_description);

    Ok(SearchResultItem {
        identifier,
        description,
        page_url: expected_page,
        default_branch,
        stars: raw.stargazers_count,
        updated_at,
    })
}

fn clean_description(raw: &str) -> Option<String> {
    let text: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_DESCRIPTION_LEN)
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

//! Search result rendering.
//!
//! Payloads are JSON. Install URLs are rebuilt from validated parts, never
//! copied from the upstream response.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKind;
use crate::error::{HubError, HubResult};
use crate::registry::SearchResultItem;
use crate::validate::ArchiveUrl;

/// Shown when a search matches nothing.
pub const EMPTY_RESULTS_MESSAGE: &str = "No patched components found matching that name.";

/// Description used when the publisher left it blank.
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Badge carried by every card.
pub const PATCHED_BADGE: &str = "Patched";

/// One search result as shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Artifact identifier, also the install folder name.
    pub identifier: String,
    /// Description or [`NO_DESCRIPTION`].
    pub description: String,
    /// Repository page.
    pub page_url: String,
    /// Archive URL to pass back to install.
    pub install_url: String,
    /// Kind the search was for.
    pub kind: ArtifactKind,
    /// Star count.
    pub stars: u64,
    /// Last update, `YYYY-MM-DD`.
    pub updated: String,
    /// Always [`PATCHED_BADGE`].
    pub badge: String,
}

/// A rendered search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPayload {
    /// Kind the search was for.
    pub kind: ArtifactKind,
    /// Cards in upstream order.
    pub cards: Vec<Card>,
    /// Set when there are no cards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchPayload {
    /// Build the payload for a set of items.
    #[must_use]
    pub fn from_items(items: &[SearchResultItem], kind: ArtifactKind, publisher_org: &str) -> Self {
        let cards: Vec<Card> = items
            .iter()
            .map(|item| Card {
                identifier: item.identifier.to_string(),
                description: item
                    .description
                    .clone()
                    .unwrap_or_else(|| NO_DESCRIPTION.to_owned()),
                page_url: item.page_url.clone(),
                install_url: ArchiveUrl::for_branch(
                    publisher_org,
                    &item.identifier,
                    &item.default_branch,
                ),
                kind,
                stars: item.stars,
                updated: item.updated_at.format("%Y-%m-%d").to_string(),
                badge: PATCHED_BADGE.to_owned(),
            })
            .collect();
        let message = cards.is_empty().then(|| EMPTY_RESULTS_MESSAGE.to_owned());
        Self {
            kind,
            cards,
            message,
        }
    }

    /// Serialize to the cached string form.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnexpectedSchema`] if serialization fails.
    pub fn to_json(&self) -> HubResult<String> {
        serde_json::to_string(self)
            .map_err(|e| HubError::UnexpectedSchema(format!("failed to render results: {e}")))
    }
}

//! Search query construction and fingerprinting.

use crate::artifact::ArtifactKind;

/// Longest sanitized term sent upstream, in characters.
pub const MAX_TERM_LEN: usize = 128;

/// Boolean operators understood by the search syntax.
const OPERATORS: [&str; 3] = ["OR", "AND", "NOT"];

/// A search request as the hub sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Raw caller-supplied term.
    pub term: String,
    /// Artifact kind being searched for.
    pub kind: ArtifactKind,
    /// Organization the search is scoped to.
    pub publisher_org: String,
}

impl SearchQuery {
    /// Create a query.
    #[must_use]
    pub fn new(term: impl Into<String>, kind: ArtifactKind, publisher_org: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            kind,
            publisher_org: publisher_org.into(),
        }
    }

    /// Cache key for this query.
    ///
    /// Hex BLAKE3 digest over the length-prefixed org, raw term and kind, so
    /// no two distinct queries can collide by concatenation.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for field in [
            self.publisher_org.as_str(),
            self.term.as_str(),
            self.kind.as_str(),
        ] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// The `q` parameter sent upstream: `org:{org} {sanitized term}`.
    #[must_use]
    pub fn upstream_query(&self) -> String {
        let term = sanitize_term(&self.term);
        if term.is_empty() {
            format!("org:{}", self.publisher_org)
        } else {
            format!("org:{} {term}", self.publisher_org)
        }
    }
}

/// Strip anything from a caller term that could change the search scope.
///
/// Control characters are removed, whitespace-separated tokens containing a
/// `:` (search qualifiers such as `org:` or `user:`) and the boolean
/// operators are dropped, whitespace is collapsed and the result is capped at
/// [`MAX_TERM_LEN`] characters.
#[must_use]
pub fn sanitize_term(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let kept: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|token| !token.contains(':'))
        .filter(|token| !OPERATORS.contains(token))
        .collect();

    let joined = kept.join(" ");
    match joined.char_indices().nth(MAX_TERM_LEN) {
        Some((cut, _)) => joined[..cut].trim_end().to_owned(),
        None => joined,
    }
}

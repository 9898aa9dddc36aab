//! Install capability policy.

use std::collections::HashSet;

use crate::ports::CapabilityCheck;

/// Identity entry that grants the capability to everyone.
pub const WILDCARD: &str = "*";

/// Grants the install capability to a fixed set of identities.
///
/// This is a policy adapter, not a permission system: the host decides who
/// a caller is, this only answers yes or no.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    installers: HashSet<String>,
    everyone: bool,
}

impl AllowList {
    /// Build from a list of identities. A `*` entry allows any caller.
    #[must_use]
    pub fn new<I, S>(installers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let installers: HashSet<String> = installers.into_iter().map(Into::into).collect();
        let everyone = installers.contains(WILDCARD);
        Self {
            installers,
            everyone,
        }
    }

    /// Allow every caller.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::new([WILDCARD])
    }
}

impl CapabilityCheck for AllowList {
    fn caller_can_install(&self, identity: &str) -> bool {
        self.everyone || self.installers.contains(identity)
    }
}

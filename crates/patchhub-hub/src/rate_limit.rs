//! Per-caller, per-operation request throttling.
//!
//! A caller gets one request per window per operation. The first call in a
//! cold window stores a token that expires at `now + window`; while that
//! token is live every further call for the same `(identity, operation)` is
//! refused. Expired tokens are simply overwritten by the next allowed call.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::clock::{Clock, SystemClock, expiry_after};

/// Operations that are throttled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Registry search.
    Search,
    /// Artifact install.
    Install,
}

impl Operation {
    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token-per-window rate limiter.
pub struct RateLimiter {
    tokens: DashMap<(String, Operation), DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tokens", &self.tokens.len())
            .finish_non_exhaustive()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl RateLimiter {
    /// Create a rate limiter backed by the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::new(),
            clock,
        }
    }

    /// Check and record a request.
    ///
    /// Returns `true` and opens a new window if no live token exists for
    /// `(identity, operation)`, `false` otherwise. A refused call records
    /// nothing, so it does not extend the window.
    pub fn allow(&self, identity: &str, operation: Operation, window_secs: u64) -> bool {
        let now = self.clock.now();
        match self.tokens.entry((identity.to_owned(), operation)) {
            Entry::Occupied(mut token) => {
                if *token.get() > now {
                    return false;
                }
                token.insert(expiry_after(now, window_secs));
                true
            },
            Entry::Vacant(slot) => {
                slot.insert(expiry_after(now, window_secs));
                true
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (RateLimiter::new(clock.clone()), clock)
    }

    #[test]
    fn first_call_allowed_second_blocked() {
        let (limiter, _) = limiter();
        assert!(limiter.allow("alice", Operation::Search, 2));
        assert!(!limiter.allow("alice", Operation::Search, 2));
    }

    #[test]
    fn window_reopens_after_expiry() {
        let (limiter, clock) = limiter();
        assert!(limiter.allow("alice", Operation::Search, 2));
        clock.advance_secs(1);
        assert!(!limiter.allow("alice", Operation::Search, 2));
        clock.advance_secs(1);
        assert!(limiter.allow("alice", Operation::Search, 2));
    }

    #[test]
    fn blocked_call_does_not_extend_window() {
        let (limiter, clock) = limiter();
        assert!(limiter.allow("alice", Operation::Install, 10));
        clock.advance_secs(9);
        assert!(!limiter.allow("alice", Operation::Install, 10));
        clock.advance_secs(1);
        assert!(limiter.allow("alice", Operation::Install, 10));
    }

    #[test]
    fn operations_are_independent() {
        let (limiter, _) = limiter();
        assert!(limiter.allow("alice", Operation::Search, 60));
        assert!(limiter.allow("alice", Operation::Install, 60));
        assert!(!limiter.allow("alice", Operation::Search, 60));
        assert!(!limiter.allow("alice", Operation::Install, 60));
    }

    #[test]
    fn identities_are_independent() {
        let (limiter, _) = limiter();
        assert!(limiter.allow("alice", Operation::Search, 60));
        assert!(limiter.allow("bob", Operation::Search, 60));
    }

    #[test]
    fn zero_window_never_blocks() {
        let (limiter, _) = limiter();
        assert!(limiter.allow("alice", Operation::Search, 0));
        assert!(limiter.allow("alice", Operation::Search, 0));
    }
}

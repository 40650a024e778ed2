//! Connection-scoped table of in-flight `reqauth` challenges.

use std::collections::HashMap;

use crate::auth::PendingChallenge;

/// Maps a connection's in-flight `reqauth` request ids to their pending
/// challenge. Lives only as long as the connection: dropped wholesale on
/// disconnect, so a replayed request id on a fresh connection always misses.
#[derive(Debug, Default)]
pub struct PendingAuthTable {
    requests: HashMap<i64, PendingChallenge>,
}

impl PendingAuthTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
        }
    }

    pub fn insert(&mut self, reqid: i64, challenge: PendingChallenge) {
        self.requests.insert(reqid, challenge);
    }

    /// Remove and return the pending challenge for `reqid`, if any. Used by
    /// both the success and failure paths of `confauth`: either way the
    /// request is consumed.
    pub fn take(&mut self, reqid: i64) -> Option<PendingChallenge> {
        self.requests.remove(&reqid)
    }
}

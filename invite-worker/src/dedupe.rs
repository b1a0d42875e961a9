use std::collections::HashSet;

use invite_common::invitation::InvitationEvent;

/// Remembers every invitation seen during this run. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<InvitationEvent>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time an invitation is seen and `false` for every repeat.
    pub fn check_and_mark(&mut self, event: &InvitationEvent) -> bool {
        if self.seen.contains(event) {
            return false;
        }
        self.seen.insert(event.clone())
    }
}

//! Reaction board - one ephemeral emoji per identity

use std::collections::HashMap;
use std::time::Duration;

use vroom_core::{ParticipantIdentity, Timestamp};

/// An active reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionState {
    pub emoji: String,
    pub expires_at: Timestamp,
}

impl ReactionState {
    /// Visible strictly before `expires_at`
    #[inline]
    pub fn is_active(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// Active reactions keyed by identity.
///
/// A newer reaction overwrites the current one rather than queueing behind
/// it. Expired entries are removed by [`ReactionBoard::sweep`]; lookups
/// never return an expired entry even before the sweep runs.
#[derive(Debug, Clone)]
pub struct ReactionBoard {
    ttl: Duration,
    reactions: HashMap<ParticipantIdentity, ReactionState>,
}

impl ReactionBoard {
    pub fn new(ttl: Duration) -> Self {
        ReactionBoard {
            ttl,
            reactions: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Set (or overwrite) the reaction for `identity`; returns its expiry
    pub fn set(&mut self, identity: ParticipantIdentity, emoji: impl Into<String>, now: Timestamp) -> Timestamp {
        let expires_at = now.saturating_add(self.ttl);
        self.reactions.insert(
            identity,
            ReactionState {
                emoji: emoji.into(),
                expires_at,
            },
        );
        expires_at
    }

    /// Active reaction for `identity`, if any
    pub fn active(&self, identity: &ParticipantIdentity, now: Timestamp) -> Option<&ReactionState> {
        self.reactions.get(identity).filter(|r| r.is_active(now))
    }

    /// Keep only reactions whose identity satisfies `keep`. Returns how
    /// many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&ParticipantIdentity) -> bool) -> usize {
        let before = self.reactions.len();
        self.reactions.retain(|identity, _| keep(identity));
        before - self.reactions.len()
    }

    /// Drop every expired reaction. Returns true if anything was removed.
    pub fn sweep(&mut self, now: Timestamp) -> bool {
        let before = self.reactions.len();
        self.reactions.retain(|_, r| r.is_active(now));
        before != self.reactions.len()
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}

//! Roster - the provider's view of who is connected

use crate::ParticipantIdentity;

/// One connected participant as reported by the media provider
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub identity: ParticipantIdentity,
    pub display_name: String,
    /// Avatar model URL, if the participant chose one
    pub avatar_url: Option<String>,
    pub is_local: bool,
    pub is_muted: bool,
    pub is_speaking: bool,
}

impl RosterEntry {
    pub fn new(identity: impl Into<ParticipantIdentity>, display_name: impl Into<String>) -> Self {
        RosterEntry {
            identity: identity.into(),
            display_name: display_name.into(),
            avatar_url: None,
            is_local: false,
            is_muted: false,
            is_speaking: false,
        }
    }

    pub fn local(identity: impl Into<ParticipantIdentity>, display_name: impl Into<String>) -> Self {
        RosterEntry {
            is_local: true,
            ..Self::new(identity, display_name)
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.is_muted = muted;
        self
    }

    pub fn speaking(mut self, speaking: bool) -> Self {
        self.is_speaking = speaking;
        self
    }
}

//! Reaction encoding - `{identity, emoji}` on the reliable topic

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vroom_core::ParticipantIdentity;

use crate::{CodecError, CodecResult};

/// Reactions offered by the call controls
pub const REACTION_PALETTE: [&str; 5] = ["👍", "👏", "❤️", "😂", "🔥"];

/// A reaction as announced by its sender
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionMessage {
    /// Identity the sender claims
    pub identity: ParticipantIdentity,
    pub emoji: String,
}

#[derive(Serialize, Deserialize)]
struct ReactionWire<'a> {
    identity: std::borrow::Cow<'a, str>,
    emoji: std::borrow::Cow<'a, str>,
}

impl ReactionMessage {
    pub fn new(identity: ParticipantIdentity, emoji: impl Into<String>) -> Self {
        ReactionMessage {
            identity,
            emoji: emoji.into(),
        }
    }

    /// Whether the emoji is one the call controls offer
    pub fn is_from_palette(&self) -> bool {
        REACTION_PALETTE.contains(&self.emoji.as_str())
    }

    pub fn encode(&self) -> CodecResult<Bytes> {
        if self.emoji.is_empty() {
            return Err(CodecError::EmptyField("emoji"));
        }
        let wire = ReactionWire {
            identity: self.identity.as_str().into(),
            emoji: self.emoji.as_str().into(),
        };
        Ok(Bytes::from(serde_json::to_vec(&wire)?))
    }

    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let wire: ReactionWire<'_> = serde_json::from_slice(data)?;
        if wire.emoji.is_empty() {
            return Err(CodecError::EmptyField("emoji"));
        }
        Ok(ReactionMessage {
            identity: ParticipantIdentity::new(wire.identity.as_ref()),
            emoji: wire.emoji.into_owned(),
        })
    }
}

//! Media provider interface
//!
//! The provider supplies a connect/disconnect lifecycle, a topic-scoped
//! many-to-many data primitive with a reliable/unreliable flag, a live roster
//! and per-participant mute/speaking signals. Only the parts VROOM rides on
//! are modelled here.

use std::fmt;

use bytes::Bytes;
use vroom_core::{ParticipantIdentity, RosterEntry, VroomResult};

/// Provider connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery mode for a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    /// Retransmitted and ordered; may head-of-line block
    Reliable,
    /// Best effort; may drop, duplicate or reorder
    Unreliable,
}

/// A data message received from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DataMessage {
    pub topic: String,
    /// Provider-attested sender; `None` for server-originated messages
    pub sender: Option<ParticipantIdentity>,
    pub payload: Bytes,
}

impl DataMessage {
    pub fn new(topic: impl Into<String>, sender: Option<ParticipantIdentity>, payload: Bytes) -> Self {
        DataMessage {
            topic: topic.into(),
            sender,
            payload,
        }
    }
}

/// Everything the provider pushes at us
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    ConnectionStateChanged(ConnectionState),
    /// Full roster in provider order, local participant included
    RosterChanged(Vec<RosterEntry>),
    Data(DataMessage),
}

/// Outbound half of the provider's data primitive.
///
/// `publish` must not block; providers queue internally and report
/// failures through the returned result.
pub trait DataTransport: Send + Sync {
    fn connection_state(&self) -> ConnectionState;

    fn local_identity(&self) -> ParticipantIdentity;

    fn publish(&self, topic: &str, payload: Bytes, reliability: Reliability) -> VroomResult<()>;
}

//! In-memory media provider
//!
//! A single room: members join with an identity and get a transport plus a
//! room-event stream. The hub attests senders, keeps the roster, and routes
//! unreliable messages through a per-receiver [`ChaosLink`]. Reliable
//! messages are always delivered in order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use bytes::Bytes;
use vroom_core::{ParticipantIdentity, RosterEntry, VroomError, VroomResult};
use vroom_transport::{ConnectionState, DataMessage, DataTransport, Reliability, RoomEvent};

use crate::{ChaosConfig, ChaosLink, ChaosStats};

/// Capacity of each member's event queue
pub const MEMBER_EVENT_BUFFER: usize = 1024;

struct Member {
    entry: RosterEntry,
    events: mpsc::Sender<RoomEvent>,
    link: ChaosLink<DataMessage>,
    connection: ConnectionState,
}

impl Member {
    fn deliver(&self, event: RoomEvent) {
        if self.events.try_send(event).is_err() {
            tracing::warn!(member = %self.entry.identity, "Member event queue full or closed, dropping event");
        }
    }
}

struct HubState {
    chaos: ChaosConfig,
    seed: u64,
    joins: u64,
    members: Vec<Member>,
    departed_stats: ChaosStats,
}

impl HubState {
    fn member(&self, identity: &ParticipantIdentity) -> Option<&Member> {
        self.members.iter().find(|m| &m.entry.identity == identity)
    }

    fn member_mut(&mut self, identity: &ParticipantIdentity) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.entry.identity == identity)
    }

    fn broadcast_roster(&self) {
        for member in &self.members {
            let roster = self
                .members
                .iter()
                .map(|m| RosterEntry {
                    is_local: m.entry.identity == member.entry.identity,
                    ..m.entry.clone()
                })
                .collect();
            member.deliver(RoomEvent::RosterChanged(roster));
        }
    }
}

/// One member's view of the hub
pub struct HubPeer {
    pub transport: Arc<HubTransport>,
    pub events: mpsc::Receiver<RoomEvent>,
}

/// In-memory room
#[derive(Clone)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    /// Room whose unreliable links use `chaos`, seeded from `seed`
    pub fn new(chaos: ChaosConfig, seed: u64) -> Self {
        MemoryHub {
            state: Arc::new(Mutex::new(HubState {
                chaos,
                seed,
                joins: 0,
                members: Vec::new(),
                departed_stats: ChaosStats::default(),
            })),
        }
    }

    /// Perfect network
    pub fn reliable() -> Self {
        Self::new(ChaosConfig::none(), 0)
    }

    /// Join the room. The new member is connected immediately and every
    /// member receives the updated roster.
    pub fn join(&self, identity: impl Into<ParticipantIdentity>, display_name: &str) -> HubPeer {
        let identity = identity.into();
        let (tx, rx) = mpsc::channel(MEMBER_EVENT_BUFFER);

        let mut state = self.state.lock();
        state.joins += 1;
        let link_seed = state.seed.wrapping_add(state.joins);
        let member = Member {
            entry: RosterEntry::new(identity.clone(), display_name),
            events: tx,
            link: ChaosLink::new(state.chaos.clone(), link_seed),
            connection: ConnectionState::Connected,
        };
        member.deliver(RoomEvent::ConnectionStateChanged(ConnectionState::Connecting));
        member.deliver(RoomEvent::ConnectionStateChanged(ConnectionState::Connected));

        if let Some(existing) = state.member_mut(&identity) {
            // Rejoin under the same identity replaces the old session
            tracing::debug!(%identity, "Replacing existing member");
            *existing = member;
        } else {
            state.members.push(member);
        }
        state.broadcast_roster();
        tracing::debug!(%identity, members = state.members.len(), "Member joined");

        HubPeer {
            transport: Arc::new(HubTransport {
                hub: self.clone(),
                identity,
            }),
            events: rx,
        }
    }

    /// Leave the room; remaining members get the new roster
    pub fn leave(&self, identity: &ParticipantIdentity) {
        let mut state = self.state.lock();
        let Some(pos) = state.members.iter().position(|m| &m.entry.identity == identity) else {
            return;
        };
        let member = state.members.remove(pos);
        member.deliver(RoomEvent::ConnectionStateChanged(ConnectionState::Disconnected));
        let stats = member.link.stats().clone();
        state.departed_stats.merge(&stats);
        state.broadcast_roster();
    }

    /// Change one member's connection state (e.g. simulate reconnecting)
    pub fn set_connection(&self, identity: &ParticipantIdentity, connection: ConnectionState) {
        let mut state = self.state.lock();
        if let Some(member) = state.member_mut(identity) {
            member.connection = connection;
            member.deliver(RoomEvent::ConnectionStateChanged(connection));
        }
    }

    pub fn set_speaking(&self, identity: &ParticipantIdentity, speaking: bool) {
        self.update_entry(identity, |e| e.is_speaking = speaking);
    }

    pub fn set_muted(&self, identity: &ParticipantIdentity, muted: bool) {
        self.update_entry(identity, |e| e.is_muted = muted);
    }

    pub fn set_avatar(&self, identity: &ParticipantIdentity, url: &str) {
        self.update_entry(identity, |e| e.avatar_url = Some(url.to_string()));
    }

    /// Release every message held back by reordering
    pub fn flush(&self) {
        let mut state = self.state.lock();
        for member in &mut state.members {
            for message in member.link.flush() {
                member.deliver(RoomEvent::Data(message));
            }
        }
    }

    /// Identities in join order
    pub fn roster(&self) -> Vec<ParticipantIdentity> {
        self.state
            .lock()
            .members
            .iter()
            .map(|m| m.entry.identity.clone())
            .collect()
    }

    /// Chaos statistics summed over every link, past and present
    pub fn chaos_stats(&self) -> ChaosStats {
        let state = self.state.lock();
        let mut total = state.departed_stats.clone();
        for member in &state.members {
            total.merge(member.link.stats());
        }
        total
    }

    fn update_entry(&self, identity: &ParticipantIdentity, f: impl FnOnce(&mut RosterEntry)) {
        let mut state = self.state.lock();
        if let Some(member) = state.member_mut(identity) {
            f(&mut member.entry);
            state.broadcast_roster();
        }
    }

    fn route(&self, from: &ParticipantIdentity, topic: &str, payload: Bytes, reliability: Reliability) -> VroomResult<()> {
        let mut state = self.state.lock();
        match state.member(from) {
            Some(sender) if sender.connection.is_connected() => {}
            Some(sender) => return Err(VroomError::ChannelUnavailable(sender.connection.to_string())),
            None => return Err(VroomError::ChannelUnavailable(ConnectionState::Disconnected.to_string())),
        }

        for member in state.members.iter_mut().filter(|m| &m.entry.identity != from) {
            let message = DataMessage::new(topic, Some(from.clone()), payload.clone());
            let arrived = match reliability {
                Reliability::Reliable => vec![message],
                Reliability::Unreliable => member.link.transmit(message),
            };
            for message in arrived {
                member.deliver(RoomEvent::Data(message));
            }
        }
        Ok(())
    }
}

/// A member's outbound data path
pub struct HubTransport {
    hub: MemoryHub,
    identity: ParticipantIdentity,
}

impl DataTransport for HubTransport {
    fn connection_state(&self) -> ConnectionState {
        self.hub
            .state
            .lock()
            .member(&self.identity)
            .map(|m| m.connection)
            .unwrap_or(ConnectionState::Disconnected)
    }

    fn local_identity(&self) -> ParticipantIdentity {
        self.identity.clone()
    }

    fn publish(&self, topic: &str, payload: Bytes, reliability: Reliability) -> VroomResult<()> {
        self.hub.route(&self.identity, topic, payload, reliability)
    }
}

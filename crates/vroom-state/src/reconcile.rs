//! Participant reconciliation
//!
//! Merges the provider roster with local capture, remote telemetry and
//! reactions into a full replacement snapshot. Every input is applied as
//! "latest wins" and every recompute reads all inputs afresh, so calls from
//! the capture, network and sweep sources may interleave in any order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use vroom_core::{ParticipantIdentity, RosterEntry, TelemetryPayload, Timestamp};

use crate::{ParticipantViewModel, ReactionBoard, TelemetryState};

/// Avatar used when a participant has not picked one
pub const DEFAULT_AVATAR_URL: &str = "/models/default-avatar.glb";

/// Reconciler configuration
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How long a reaction stays visible
    pub reaction_ttl: Duration,
    /// Cadence of the expiry sweep (driven by the runtime)
    pub sweep_interval: Duration,
    pub default_avatar_url: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            reaction_ttl: Duration::from_millis(4000),
            sweep_interval: Duration::from_millis(500),
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

/// Participant reconciler
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcilerConfig,
    roster: Vec<RosterEntry>,
    local_telemetry: TelemetryState,
    remote_telemetry: HashMap<ParticipantIdentity, TelemetryState>,
    reactions: ReactionBoard,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Reconciler {
            reactions: ReactionBoard::new(config.reaction_ttl),
            config,
            roster: Vec::new(),
            local_telemetry: TelemetryState::NoTelemetry,
            remote_telemetry: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Replace the roster.
    ///
    /// Telemetry and reactions are kept only for identities in the new
    /// roster. Data that beat the roster update survives when that update
    /// names its sender; anything else, including late packets from a
    /// participant who already left, is dropped here.
    pub fn set_roster(&mut self, roster: Vec<RosterEntry>) {
        {
            let current: HashSet<&ParticipantIdentity> = roster.iter().map(|e| &e.identity).collect();

            for entry in self.roster.iter().filter(|e| !current.contains(&e.identity)) {
                tracing::debug!(identity = %entry.identity, "Participant left, dropping state");
            }

            let before = self.remote_telemetry.len();
            self.remote_telemetry.retain(|identity, _| current.contains(identity));
            let pruned = before - self.remote_telemetry.len();
            let pruned_reactions = self.reactions.retain(|identity| current.contains(identity));
            if pruned + pruned_reactions > 0 {
                tracing::trace!(telemetry = pruned, reactions = pruned_reactions, "Pruned state outside roster");
            }
        }

        self.roster = roster;
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Identity of the local participant, once the roster names one
    pub fn local_identity(&self) -> Option<&ParticipantIdentity> {
        self.roster.iter().find(|e| e.is_local).map(|e| &e.identity)
    }

    /// Record a local capture sample
    pub fn apply_local(&mut self, payload: TelemetryPayload) {
        self.local_telemetry.update(payload);
    }

    /// Record a received sample; the latest arrival wins
    pub fn apply_remote(&mut self, from: ParticipantIdentity, payload: TelemetryPayload) {
        self.remote_telemetry.entry(from).or_default().update(payload);
    }

    /// Show `emoji` over `identity` until `now + reaction_ttl`
    pub fn set_reaction(&mut self, identity: ParticipantIdentity, emoji: impl Into<String>, now: Timestamp) {
        self.reactions.set(identity, emoji, now);
    }

    /// Remove expired reactions. Returns true if the view changed.
    pub fn sweep(&mut self, now: Timestamp) -> bool {
        self.reactions.sweep(now)
    }

    pub fn remote_telemetry(&self, identity: &ParticipantIdentity) -> Option<&TelemetryState> {
        self.remote_telemetry.get(identity)
    }

    pub fn reactions(&self) -> &ReactionBoard {
        &self.reactions
    }

    /// Build the ordered view-model list.
    ///
    /// Local participant first and mirrored, the rest in roster order.
    pub fn snapshot(&self, now: Timestamp) -> Arc<[ParticipantViewModel]> {
        let local_index = self.roster.iter().position(|e| e.is_local);

        let ordered = local_index
            .map(|i| &self.roster[i])
            .into_iter()
            .chain(
                self.roster
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| Some(*i) != local_index)
                    .map(|(_, e)| e),
            );

        ordered
            .map(|entry| {
                let is_local = local_index.map_or(false, |i| self.roster[i].identity == entry.identity);
                let telemetry = if is_local {
                    self.local_telemetry.clone()
                } else {
                    self.remote_telemetry
                        .get(&entry.identity)
                        .cloned()
                        .unwrap_or_default()
                };

                ParticipantViewModel {
                    identity: entry.identity.clone(),
                    display_name: entry.display_name.clone(),
                    avatar_url: entry
                        .avatar_url
                        .clone()
                        .unwrap_or_else(|| self.config.default_avatar_url.clone()),
                    telemetry,
                    is_mirrored: is_local,
                    is_muted: entry.is_muted,
                    is_speaking: entry.is_speaking,
                    display_emoji: self
                        .reactions
                        .active(&entry.identity, now)
                        .map(|r| r.emoji.clone()),
                }
            })
            .collect()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

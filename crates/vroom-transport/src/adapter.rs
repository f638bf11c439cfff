//! Channel adapter
//!
//! Outbound: encode, throttle and publish on the fixed topics. Telemetry is
//! latest-value state and rides the unreliable mode; reactions have no
//! self-correcting retransmission and ride the reliable mode.
//!
//! Inbound: decode per topic and hand the result to the reconciler keyed by
//! the provider-attested sender. Nothing on the inbound path propagates an
//! error; bad messages are logged and dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use vroom_core::{ParticipantIdentity, RateLimiter, TelemetryPayload, Timestamp, VroomError, VroomResult};
use vroom_wire::{ReactionMessage, TelemetryCodec, EMOJI_TOPIC, FACE_TRACKING_TOPIC};

use crate::{DataMessage, DataTransport, Reliability};

/// Channel adapter configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Minimum spacing between outbound telemetry messages
    pub telemetry_min_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            telemetry_min_interval: Duration::from_millis(33),
        }
    }
}

/// A decoded inbound message, keyed by sender
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Telemetry {
        from: ParticipantIdentity,
        payload: TelemetryPayload,
    },
    Reaction {
        from: ParticipantIdentity,
        emoji: String,
    },
}

impl Inbound {
    pub fn sender(&self) -> &ParticipantIdentity {
        match self {
            Inbound::Telemetry { from, .. } | Inbound::Reaction { from, .. } => from,
        }
    }
}

/// Adapter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub telemetry_sent: u64,
    pub reactions_sent: u64,
    pub dropped_disconnected: u64,
    pub dropped_throttled: u64,
    pub publish_failures: u64,
    pub received: u64,
    pub decode_failures: u64,
    pub ignored: u64,
}

/// Distribution channel adapter over a provider [`DataTransport`]
pub struct ChannelAdapter {
    transport: Arc<dyn DataTransport>,
    throttle: Mutex<RateLimiter>,
    closed: AtomicBool,
    /// Set after the first disconnected-drop warning, cleared on the next
    /// successful send
    warned_disconnected: AtomicBool,
    stats: Mutex<ChannelStats>,
}

impl ChannelAdapter {
    pub fn new(transport: Arc<dyn DataTransport>, config: ChannelConfig) -> Self {
        ChannelAdapter {
            transport,
            throttle: Mutex::new(RateLimiter::new(config.telemetry_min_interval)),
            closed: AtomicBool::new(false),
            warned_disconnected: AtomicBool::new(false),
            stats: Mutex::new(ChannelStats::default()),
        }
    }

    pub fn local_identity(&self) -> ParticipantIdentity {
        self.transport.local_identity()
    }

    /// Broadcast a telemetry sample on the unreliable topic.
    ///
    /// Returns `Ok(false)` when the sample was throttled. Errors are all
    /// recoverable and already logged; callers may ignore them.
    pub fn send_telemetry(&self, payload: &TelemetryPayload, now: Timestamp) -> VroomResult<bool> {
        self.ensure_sendable()?;

        if !self.throttle.lock().try_acquire(now) {
            self.stats.lock().dropped_throttled += 1;
            return Ok(false);
        }

        let body = TelemetryCodec::encode(payload).map_err(|e| {
            tracing::warn!("Dropping telemetry that cannot be encoded: {}", e);
            VroomError::from(e)
        })?;

        self.publish(FACE_TRACKING_TOPIC, body, Reliability::Unreliable)?;
        self.stats.lock().telemetry_sent += 1;
        Ok(true)
    }

    /// Broadcast a reaction on the reliable topic
    pub fn send_reaction(&self, reaction: &ReactionMessage) -> VroomResult<()> {
        self.ensure_sendable()?;

        let body = reaction.encode().map_err(|e| {
            tracing::warn!("Dropping reaction that cannot be encoded: {}", e);
            VroomError::from(e)
        })?;

        self.publish(EMOJI_TOPIC, body, Reliability::Reliable)?;
        self.stats.lock().reactions_sent += 1;
        Ok(())
    }

    /// Decode an inbound message and key it by sender.
    ///
    /// `None` means the message was dropped (closed adapter, no sender,
    /// unknown topic or malformed body).
    pub fn dispatch(&self, message: DataMessage) -> Option<Inbound> {
        if self.is_closed() {
            return None;
        }
        self.stats.lock().received += 1;

        let Some(from) = message.sender else {
            tracing::debug!(topic = %message.topic, "Ignoring data message without a sender");
            self.stats.lock().ignored += 1;
            return None;
        };

        match message.topic.as_str() {
            FACE_TRACKING_TOPIC => match TelemetryCodec::decode(&message.payload) {
                Ok(payload) => Some(Inbound::Telemetry { from, payload }),
                Err(e) => {
                    self.decode_failed(&from, FACE_TRACKING_TOPIC, &e);
                    None
                }
            },
            EMOJI_TOPIC => match ReactionMessage::decode(&message.payload) {
                Ok(reaction) => {
                    if reaction.identity != from {
                        tracing::warn!(
                            sender = %from,
                            claimed = %reaction.identity,
                            "Reaction identity does not match sender, using sender"
                        );
                    }
                    if !reaction.is_from_palette() {
                        tracing::debug!(sender = %from, emoji = %reaction.emoji, "Reaction outside the palette");
                    }
                    Some(Inbound::Reaction {
                        from,
                        emoji: reaction.emoji,
                    })
                }
                Err(e) => {
                    self.decode_failed(&from, EMOJI_TOPIC, &e);
                    None
                }
            },
            other => {
                tracing::debug!(topic = other, sender = %from, "Ignoring message on unknown topic");
                self.stats.lock().ignored += 1;
                None
            }
        }
    }

    /// Stop sending and dispatching. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("Channel adapter closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ChannelStats {
        *self.stats.lock()
    }

    fn ensure_sendable(&self) -> VroomResult<()> {
        if self.is_closed() {
            return Err(VroomError::ChannelClosed);
        }

        let state = self.transport.connection_state();
        if !state.is_connected() {
            self.stats.lock().dropped_disconnected += 1;
            // One warning per disconnected stretch; telemetry would repeat it 30 times a second
            if !self.warned_disconnected.swap(true, Ordering::AcqRel) {
                tracing::warn!(%state, "Dropping outbound message while not connected");
            } else {
                tracing::trace!(%state, "Dropping outbound message while not connected");
            }
            return Err(VroomError::ChannelUnavailable(state.to_string()));
        }

        self.warned_disconnected.store(false, Ordering::Release);
        Ok(())
    }

    fn publish(&self, topic: &str, body: bytes::Bytes, reliability: Reliability) -> VroomResult<()> {
        self.transport.publish(topic, body, reliability).map_err(|e| {
            tracing::warn!(topic, "Publish failed: {}", e);
            self.stats.lock().publish_failures += 1;
            e
        })
    }

    fn decode_failed(&self, from: &ParticipantIdentity, topic: &str, error: &vroom_wire::CodecError) {
        tracing::warn!(sender = %from, topic, "Dropping malformed message: {}", error);
        self.stats.lock().decode_failures += 1;
    }
}

impl std::fmt::Debug for ChannelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelAdapter")
            .field("connection", &self.transport.connection_state())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionState;
    use bytes::Bytes;
    use proptest::prelude::*;
    use vroom_core::{BlendshapeSample, Rotation};

    struct Recorder {
        state: Mutex<ConnectionState>,
        sent: Mutex<Vec<(String, Bytes, Reliability)>>,
        fail: AtomicBool,
    }

    impl Recorder {
        fn new(state: ConnectionState) -> Arc<Self> {
            Arc::new(Recorder {
                state: Mutex::new(state),
                sent: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        fn set_state(&self, state: ConnectionState) {
            *self.state.lock() = state;
        }

        fn sent(&self) -> Vec<(String, Bytes, Reliability)> {
            self.sent.lock().clone()
        }
    }

    impl DataTransport for Recorder {
        fn connection_state(&self) -> ConnectionState {
            *self.state.lock()
        }

        fn local_identity(&self) -> ParticipantIdentity {
            "me".into()
        }

        fn publish(&self, topic: &str, payload: Bytes, reliability: Reliability) -> VroomResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(VroomError::Publish("provider queue full".into()));
            }
            self.sent.lock().push((topic.to_string(), payload, reliability));
            Ok(())
        }
    }

    fn sample() -> TelemetryPayload {
        TelemetryPayload::new(
            vec![BlendshapeSample::new("jawOpen", 0.5)],
            Rotation::new(0.1, -0.2, 0.3),
        )
    }

    fn adapter(recorder: &Arc<Recorder>) -> ChannelAdapter {
        ChannelAdapter::new(recorder.clone(), ChannelConfig::default())
    }

    #[test]
    fn test_telemetry_goes_out_unreliable() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);

        assert_eq!(channel.send_telemetry(&sample(), Timestamp::from_millis(0)), Ok(true));

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, FACE_TRACKING_TOPIC);
        assert_eq!(sent[0].2, Reliability::Unreliable);
        assert_eq!(TelemetryCodec::decode(&sent[0].1).unwrap(), sample());
    }

    #[test]
    fn test_reaction_goes_out_reliable() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);

        channel
            .send_reaction(&ReactionMessage::new("me".into(), "👍"))
            .unwrap();

        let sent = recorder.sent();
        assert_eq!(sent[0].0, EMOJI_TOPIC);
        assert_eq!(sent[0].2, Reliability::Reliable);
        assert_eq!(channel.stats().reactions_sent, 1);
    }

    #[test]
    fn test_sends_dropped_while_disconnected() {
        let recorder = Recorder::new(ConnectionState::Reconnecting);
        let channel = adapter(&recorder);

        let err = channel
            .send_telemetry(&sample(), Timestamp::from_millis(0))
            .unwrap_err();
        assert_eq!(err, VroomError::ChannelUnavailable("reconnecting".into()));
        assert!(err.is_recoverable());
        assert!(channel
            .send_reaction(&ReactionMessage::new("me".into(), "🔥"))
            .is_err());

        assert!(recorder.sent().is_empty());
        assert_eq!(channel.stats().dropped_disconnected, 2);

        // Nothing was queued: reconnecting does not flush old messages
        recorder.set_state(ConnectionState::Connected);
        assert_eq!(channel.send_telemetry(&sample(), Timestamp::from_millis(100)), Ok(true));
        assert_eq!(recorder.sent().len(), 1);
    }

    #[test]
    fn test_telemetry_throttled() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);

        assert_eq!(channel.send_telemetry(&sample(), Timestamp::from_millis(0)), Ok(true));
        assert_eq!(channel.send_telemetry(&sample(), Timestamp::from_millis(10)), Ok(false));
        assert_eq!(channel.send_telemetry(&sample(), Timestamp::from_millis(33)), Ok(true));

        assert_eq!(recorder.sent().len(), 2);
        assert_eq!(channel.stats().dropped_throttled, 1);
    }

    #[test]
    fn test_publish_failure_is_recoverable() {
        let recorder = Recorder::new(ConnectionState::Connected);
        recorder.fail.store(true, Ordering::SeqCst);
        let channel = adapter(&recorder);

        let err = channel
            .send_telemetry(&sample(), Timestamp::from_millis(0))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(channel.stats().publish_failures, 1);
    }

    #[test]
    fn test_dispatch_telemetry() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);
        let body = TelemetryCodec::encode(&sample()).unwrap();

        let inbound = channel.dispatch(DataMessage::new(FACE_TRACKING_TOPIC, Some("bob".into()), body));

        assert_eq!(
            inbound,
            Some(Inbound::Telemetry {
                from: "bob".into(),
                payload: sample(),
            })
        );
    }

    #[test]
    fn test_dispatch_reaction_uses_attested_sender() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);
        let body = ReactionMessage::new("mallory".into(), "😂").encode().unwrap();

        let inbound = channel
            .dispatch(DataMessage::new(EMOJI_TOPIC, Some("bob".into()), body))
            .unwrap();

        assert_eq!(inbound.sender().as_str(), "bob");
        assert_eq!(
            inbound,
            Inbound::Reaction {
                from: "bob".into(),
                emoji: "😂".into(),
            }
        );
    }

    #[test]
    fn test_dispatch_drops_bad_messages() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);
        let good = TelemetryCodec::encode(&sample()).unwrap();

        assert!(channel
            .dispatch(DataMessage::new(FACE_TRACKING_TOPIC, Some("bob".into()), Bytes::from_static(b"{\"rotation\":")))
            .is_none());
        assert!(channel
            .dispatch(DataMessage::new(FACE_TRACKING_TOPIC, None, good.clone()))
            .is_none());
        assert!(channel
            .dispatch(DataMessage::new("chat", Some("bob".into()), good))
            .is_none());

        let stats = channel.stats();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.decode_failures, 1);
        assert_eq!(stats.ignored, 2);
    }

    #[test]
    fn test_closed_adapter_is_silent() {
        let recorder = Recorder::new(ConnectionState::Connected);
        let channel = adapter(&recorder);
        let body = TelemetryCodec::encode(&sample()).unwrap();

        channel.close();
        channel.close();

        assert!(channel
            .dispatch(DataMessage::new(FACE_TRACKING_TOPIC, Some("bob".into()), body))
            .is_none());
        assert_eq!(
            channel.send_telemetry(&sample(), Timestamp::from_millis(0)),
            Err(VroomError::ChannelClosed)
        );
        assert!(recorder.sent().is_empty());
        assert_eq!(channel.stats().received, 0);
    }

    proptest! {
        #[test]
        fn prop_dispatch_never_panics(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            emoji_topic in any::<bool>(),
        ) {
            let recorder = Recorder::new(ConnectionState::Connected);
            let channel = adapter(&recorder);
            let topic = if emoji_topic { EMOJI_TOPIC } else { FACE_TRACKING_TOPIC };
            let _ = channel.dispatch(DataMessage::new(topic, Some("fuzz".into()), Bytes::from(data)));
            prop_assert_eq!(channel.stats().received, 1);
        }
    }
}

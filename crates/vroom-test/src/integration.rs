//! End-to-end call scenarios
//!
//! Full runtimes joined through a [`MemoryHub`]:
//! - Telemetry propagation between peers
//! - Reactions over the reliable topic
//! - Roster churn
//! - Delivery under loss and reordering

use std::sync::Arc;
use std::time::Duration;

use vroom_capture::ModelOptions;
use vroom_core::{ParticipantIdentity, SystemClock, TelemetryPayload, VroomResult};
use vroom_runtime::{spawn_call, CallDeps, CallHandle, CallStats, LocalCapture, RoomView, RuntimeConfig};
use vroom_state::ParticipantViewModel;
use vroom_transport::{DataTransport, Reliability};
use vroom_wire::{TelemetryCodec, FACE_TRACKING_TOPIC};

use crate::{ChaosConfig, HubTransport, MemoryHub, SyntheticCamera, SyntheticLoader};

/// How long scenario waits give up after
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SIMULATED PEER
// ============================================================================

/// One participant running a full call runtime
pub struct SimulatedPeer {
    pub identity: ParticipantIdentity,
    pub transport: Arc<HubTransport>,
    pub call: CallHandle,
}

impl SimulatedPeer {
    /// Wait until a published view satisfies `predicate`.
    ///
    /// Returns `None` on timeout or if the call ended first.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&RoomView) -> bool) -> Option<RoomView> {
        let mut view = self.call.view();
        let waited = tokio::time::timeout(SCENARIO_TIMEOUT, view.wait_for(|v| predicate(v))).await;
        match waited {
            Ok(Ok(view)) => Some(view.clone()),
            _ => None,
        }
    }

    /// Publish a telemetry payload on the unreliable topic, bypassing the
    /// peer's own channel adapter and its throttle
    pub fn publish_raw_telemetry(&self, payload: &TelemetryPayload) -> VroomResult<()> {
        let body = TelemetryCodec::encode(payload)?;
        self.transport
            .publish(FACE_TRACKING_TOPIC, body, Reliability::Unreliable)
    }
}

/// Find a participant in a view
pub fn participant<'a>(view: &'a RoomView, identity: &str) -> Option<&'a ParticipantViewModel> {
    view.participants
        .iter()
        .find(|p| p.identity.as_str() == identity)
}

/// Score of `category` on a participant's tile, if it has telemetry
pub fn tile_score(view: &RoomView, identity: &str, category: &str) -> Option<f32> {
    participant(view, identity)?
        .blendshapes()
        .iter()
        .find(|b| b.category_name == category)
        .map(|b| b.score)
}

// ============================================================================
// CALL SIMULATION
// ============================================================================

/// A room plus the runtimes joined to it
pub struct CallSimulation {
    hub: MemoryHub,
    config: RuntimeConfig,
}

impl CallSimulation {
    pub fn new(chaos: ChaosConfig, seed: u64) -> Self {
        CallSimulation {
            hub: MemoryHub::new(chaos, seed),
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hub(&self) -> &MemoryHub {
        &self.hub
    }

    /// Join a peer. With a camera the peer captures and sends telemetry;
    /// without one it only receives. Must be called within a tokio runtime.
    pub fn join(&self, identity: &str, display_name: &str, camera: Option<SyntheticCamera>) -> SimulatedPeer {
        let peer = self.hub.join(identity, display_name);

        let capture = camera.and_then(|camera| {
            LocalCapture::prepare(
                Arc::new(camera),
                &SyntheticLoader::default(),
                ModelOptions::default(),
            )
        });

        let transport: Arc<dyn DataTransport> = peer.transport.clone();
        let call = spawn_call(
            &self.config,
            CallDeps {
                clock: Arc::new(SystemClock),
                transport,
                events: peer.events,
                capture,
            },
        );

        SimulatedPeer {
            identity: ParticipantIdentity::from(identity),
            transport: peer.transport,
            call,
        }
    }

    /// Leave the room and end the peer's call
    pub async fn leave(&self, peer: SimulatedPeer) -> CallStats {
        self.hub.leave(&peer.identity);
        peer.call.shutdown().await
    }
}

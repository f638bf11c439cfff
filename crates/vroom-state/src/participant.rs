//! Per-participant state and the render-facing view model

use std::sync::Arc;

use vroom_core::{BlendshapeSample, ParticipantIdentity, Rotation, TelemetryPayload};

/// Telemetry known for one identity.
///
/// Moves to `HasTelemetry` on the first sample and stays there; later
/// samples replace the payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TelemetryState {
    #[default]
    NoTelemetry,
    HasTelemetry(Arc<TelemetryPayload>),
}

impl TelemetryState {
    pub fn update(&mut self, payload: TelemetryPayload) {
        *self = TelemetryState::HasTelemetry(Arc::new(payload));
    }

    pub fn payload(&self) -> Option<&Arc<TelemetryPayload>> {
        match self {
            TelemetryState::NoTelemetry => None,
            TelemetryState::HasTelemetry(p) => Some(p),
        }
    }

    pub fn has_telemetry(&self) -> bool {
        matches!(self, TelemetryState::HasTelemetry(_))
    }
}

/// Everything the scene renderer needs to draw one tile.
///
/// Local and remote participants share this one shape; the flags carry the
/// difference.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantViewModel {
    pub identity: ParticipantIdentity,
    pub display_name: String,
    pub avatar_url: String,
    pub telemetry: TelemetryState,
    pub is_mirrored: bool,
    pub is_muted: bool,
    pub is_speaking: bool,
    pub display_emoji: Option<String>,
}

impl ParticipantViewModel {
    /// Blendshapes to apply; empty until the first sample arrives
    pub fn blendshapes(&self) -> &[BlendshapeSample] {
        self.telemetry.payload().map(|p| p.blendshapes()).unwrap_or(&[])
    }

    /// Head rotation; zero until the first sample arrives
    pub fn rotation(&self) -> Rotation {
        self.telemetry
            .payload()
            .map(|p| p.rotation())
            .unwrap_or(Rotation::ZERO)
    }

    pub fn is_local(&self) -> bool {
        self.is_mirrored
    }
}

//! Error types for VROOM
//!
//! Telemetry-path errors degrade the affected participant and are never
//! fatal to the call. Session-establishment errors block and are shown to
//! the user.

use thiserror::Error;

/// Core VROOM errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VroomError {
    // Capture errors
    #[error("Camera unavailable: {0}")]
    Capability(String),

    #[error("Tracking model failed to initialize: {0}")]
    Initialization(String),

    #[error("Camera stream error: {0}")]
    Stream(String),

    // Wire errors
    #[error("Malformed message: {0}")]
    Decode(String),

    #[error("Cannot encode message: {0}")]
    Encode(String),

    // Channel errors
    #[error("Channel unavailable: connection is {0}")]
    ChannelUnavailable(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Publish failed: {0}")]
    Publish(String),

    // Session errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Token request failed: {0}")]
    Token(String),

    #[error("Store error: {0}")]
    Store(String),

    // Configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VroomError {
    /// Errors the call survives with degraded data for one participant
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VroomError::Capability(_)
                | VroomError::Initialization(_)
                | VroomError::Stream(_)
                | VroomError::Decode(_)
                | VroomError::Encode(_)
                | VroomError::ChannelUnavailable(_)
                | VroomError::ChannelClosed
                | VroomError::Publish(_)
        )
    }

    /// Errors that block the session and are surfaced to the user
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            VroomError::NotFound(_)
                | VroomError::Expired(_)
                | VroomError::InvalidInput(_)
                | VroomError::Token(_)
                | VroomError::Store(_)
        )
    }
}

/// Result type for VROOM operations
pub type VroomResult<T> = Result<T, VroomError>;

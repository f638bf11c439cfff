//! VROOM Wire - Message formats carried on provider data topics
//!
//! Two topics ride on the media provider's data primitive:
//! - `face-tracking`: unreliable, one telemetry payload per capture tick
//! - `emoji`: reliable, one reaction per user click
//!
//! Bodies are JSON. Decoding never panics: anything malformed becomes a
//! `CodecError` the caller logs and drops.

pub mod error;
pub mod reaction;
pub mod telemetry;

pub use error::*;
pub use reaction::*;
pub use telemetry::*;

/// Topic for face telemetry (unreliable delivery)
pub const FACE_TRACKING_TOPIC: &str = "face-tracking";

/// Topic for emoji reactions (reliable delivery)
pub const EMOJI_TOPIC: &str = "emoji";

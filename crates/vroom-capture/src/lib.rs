//! VROOM Capture - Face telemetry from a local camera
//!
//! Camera → Landmark model → Telemetry payload → bounded-cadence emission
//!
//! # Cadence
//!
//! Frames are pulled as fast as the display cadence allows. The emission to
//! downstream consumers is the rate-limited boundary (30 Hz by default), not
//! the capture itself, so the local preview stays smooth while the network
//! sees a bounded stream.
//!
//! # Degradation
//!
//! - Camera denied or missing: `VroomError::Capability`, no local telemetry
//! - Model failed to load: `VroomError::Initialization`, no local telemetry
//! - Frame without a face: skipped, loop continues

pub mod camera;
pub mod capture;
pub mod model;
pub mod processor;

pub use camera::*;
pub use capture::*;
pub use model::*;
pub use processor::*;

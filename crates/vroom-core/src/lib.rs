//! VROOM Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by every VROOM crate:
//! - Participant identities and roster entries
//! - Time primitives (Timestamp, Clock)
//! - Face telemetry (blendshapes, head rotation)
//! - Rate limiting for bounded-cadence callbacks
//! - The error taxonomy and its degradation policy

pub mod error;
pub mod id;
pub mod rate;
pub mod roster;
pub mod telemetry;
pub mod time;

pub use error::*;
pub use id::*;
pub use rate::*;
pub use roster::*;
pub use telemetry::*;
pub use time::*;

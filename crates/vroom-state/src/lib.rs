//! VROOM State - Participant reconciliation
//!
//! This crate implements the Participant Reconciler:
//! - Per-identity latest telemetry (last received wins)
//! - Ephemeral reactions with expiry
//! - Roster merge into an ordered, local-first view-model snapshot

pub mod participant;
pub mod reaction;
pub mod reconcile;

pub use participant::*;
pub use reaction::*;
pub use reconcile::*;

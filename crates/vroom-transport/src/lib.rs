//! VROOM Transport - Distribution over the media provider's data topics
//!
//! This crate provides:
//! - The provider-facing traits (connection state, topic publish, room events)
//! - The channel adapter: outbound throttling and encoding, inbound decoding
//!   and dispatch keyed by sender identity
//!
//! Media transport itself (RTP, ICE, SFU) is the provider's job.

pub mod adapter;
pub mod provider;

pub use adapter::*;
pub use provider::*;

//! VROOM Test Harness - Simulated calls and hostile networks
//!
//! This crate provides:
//! - Chaos links (loss, reordering, duplication) for unreliable topics
//! - An in-memory media provider room implementing `DataTransport`
//! - Synthetic cameras and landmark models
//! - End-to-end call scenarios

pub mod chaos;
pub mod hub;
pub mod integration;
pub mod media;

pub use chaos::*;
pub use hub::*;
pub use integration::*;
pub use media::*;

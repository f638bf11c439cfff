//! VROOM Runtime - Call orchestration
//!
//! One event loop per call owns the reconciler and the layout tracker and
//! multiplexes the independent sources that feed them:
//! 1. Local capture samples
//! 2. Provider room events (data, roster, connection state)
//! 3. Container resize notifications
//! 4. The reaction expiry sweep
//! 5. Local commands (send reaction, shutdown)
//!
//! Every source ends in the same idempotent recompute, and the result is
//! published as a complete [`RoomView`] snapshot.

pub mod call;
pub mod config;
pub mod logging;

pub use call::*;
pub use config::*;
pub use logging::*;

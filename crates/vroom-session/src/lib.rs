//! VROOM Session - Everything that happens before the call starts
//!
//! - Join codes (`xxxx-xxxx`) and the room directory with expiry
//! - Display names and the user directory
//! - Fetching a media-provider token from the token endpoint
//!
//! Errors here block joining and are shown to the user; nothing is retried
//! automatically.

pub mod code;
pub mod name;
pub mod rooms;
pub mod token;
pub mod users;

pub use code::*;
pub use name::*;
pub use rooms::*;
pub use token::*;
pub use users::*;

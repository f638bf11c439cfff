//! Identity types
//!
//! Participant identities are opaque strings handed out by the media
//! provider. They are stable for the lifetime of a provider session and
//! unique among connected peers, which makes them the reconciliation key.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Participant identity - cheap to clone, compared by value
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantIdentity(Arc<str>);

impl ParticipantIdentity {
    #[inline]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        ParticipantIdentity(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Participant({})", self.0)
    }
}

impl fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantIdentity {
    fn from(s: &str) -> Self {
        ParticipantIdentity::new(s)
    }
}

impl From<String> for ParticipantIdentity {
    fn from(s: String) -> Self {
        ParticipantIdentity::new(s)
    }
}

impl Borrow<str> for ParticipantIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ParticipantIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

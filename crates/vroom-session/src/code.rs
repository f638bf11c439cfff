//! Join codes and generated identities

use std::fmt;

use rand::Rng;
use vroom_core::{ParticipantIdentity, VroomError, VroomResult};

/// Characters used in join codes; no `i`, `l`, `o`, `0` or `1`
pub const JOIN_CODE_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

/// Characters per half of a join code
pub const JOIN_CODE_SEGMENT: usize = 4;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A normalized room join code, e.g. `k7mq-x2ab`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    /// Random well-formed code
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut code = String::with_capacity(JOIN_CODE_SEGMENT * 2 + 1);
        for i in 0..JOIN_CODE_SEGMENT * 2 {
            if i == JOIN_CODE_SEGMENT {
                code.push('-');
            }
            let idx = rng.gen_range(0..JOIN_CODE_ALPHABET.len());
            code.push(JOIN_CODE_ALPHABET[idx] as char);
        }
        RoomCode(code)
    }

    /// Trim and lowercase user input. Only emptiness is rejected; a
    /// malformed code is simply one no room has.
    pub fn normalize(input: &str) -> VroomResult<Self> {
        let normalized = input.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(VroomError::InvalidInput("join code required".into()));
        }
        Ok(RoomCode(normalized))
    }

    /// Matches the `xxxx-xxxx` shape over the join-code alphabet
    pub fn is_well_formed(&self) -> bool {
        let bytes = self.0.as_bytes();
        bytes.len() == JOIN_CODE_SEGMENT * 2 + 1
            && bytes.iter().enumerate().all(|(i, b)| {
                if i == JOIN_CODE_SEGMENT {
                    *b == b'-'
                } else {
                    JOIN_CODE_ALPHABET.contains(b)
                }
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity for a participant the token endpoint knows nothing about:
/// `user-` followed by nine base-36 characters
pub fn guest_identity<R: Rng + ?Sized>(rng: &mut R) -> ParticipantIdentity {
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    ParticipantIdentity::new(format!("user-{suffix}"))
}

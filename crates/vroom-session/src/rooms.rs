//! Room directory
//!
//! Rooms are addressed by join code and expire when nobody has used them
//! for a while. Joining touches the room, which pushes expiry back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use vroom_core::{Timestamp, VroomError, VroomResult};

use crate::RoomCode;

/// Default inactivity window before a room expires
pub const DEFAULT_ROOM_EXPIRY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Collision retries before room creation gives up
pub const MAX_CODE_ATTEMPTS: usize = 10;

/// A room record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: u64,
    pub join_code: RoomCode,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
}

impl Room {
    /// Unused for at least `expiry` as of `now`
    pub fn is_expired(&self, now: Timestamp, expiry: Duration) -> bool {
        self.last_used_at < now.saturating_sub(expiry)
    }
}

/// Room storage
pub trait RoomDirectory: Send + Sync {
    /// Create a room under a fresh join code
    fn create(&self, now: Timestamp) -> VroomResult<Room>;

    /// Find a live room. `NotFound` for unknown codes, `Expired` for rooms
    /// past their inactivity window.
    fn lookup(&self, code: &str, now: Timestamp) -> VroomResult<Room>;

    /// Mark a room as used. Returns false if no room has this code.
    fn touch(&self, code: &str, now: Timestamp) -> VroomResult<bool>;
}

/// In-memory room directory
pub struct MemoryRoomDirectory {
    rooms: Mutex<HashMap<RoomCode, Room>>,
    rng: Mutex<StdRng>,
    next_id: AtomicU64,
    expiry: Duration,
}

impl MemoryRoomDirectory {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), DEFAULT_ROOM_EXPIRY)
    }

    pub fn with_rng(rng: StdRng, expiry: Duration) -> Self {
        MemoryRoomDirectory {
            rooms: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
            next_id: AtomicU64::new(1),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.lock().is_empty()
    }

    fn create_with(&self, now: Timestamp, mut next_code: impl FnMut() -> RoomCode) -> VroomResult<Room> {
        let mut rooms = self.rooms.lock();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = next_code();
            if rooms.contains_key(&code) {
                tracing::debug!(%code, attempt, "Join code collision");
                continue;
            }

            let room = Room {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                join_code: code.clone(),
                created_at: now,
                last_used_at: now,
            };
            rooms.insert(code, room.clone());
            tracing::info!(code = %room.join_code, "Room created");
            return Ok(room);
        }

        Err(VroomError::Store("failed to generate a unique join code".into()))
    }
}

impl Default for MemoryRoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomDirectory for MemoryRoomDirectory {
    fn create(&self, now: Timestamp) -> VroomResult<Room> {
        self.create_with(now, || RoomCode::generate(&mut *self.rng.lock()))
    }

    fn lookup(&self, code: &str, now: Timestamp) -> VroomResult<Room> {
        let code = RoomCode::normalize(code)?;
        let rooms = self.rooms.lock();
        let room = rooms
            .get(&code)
            .ok_or_else(|| VroomError::NotFound(format!("room {code}")))?;

        if room.is_expired(now, self.expiry) {
            return Err(VroomError::Expired(format!("room {code}")));
        }
        Ok(room.clone())
    }

    fn touch(&self, code: &str, now: Timestamp) -> VroomResult<bool> {
        let Ok(code) = RoomCode::normalize(code) else {
            return Ok(false);
        };
        match self.rooms.lock().get_mut(&code) {
            Some(room) => {
                room.last_used_at = room.last_used_at.max(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn directory() -> MemoryRoomDirectory {
        MemoryRoomDirectory::with_rng(StdRng::seed_from_u64(3), DEFAULT_ROOM_EXPIRY)
    }

    #[test]
    fn test_create_then_lookup() {
        let dir = directory();
        let now = Timestamp::from_secs(1_000);

        let room = dir.create(now).unwrap();
        assert!(room.join_code.is_well_formed());

        let shouted = room.join_code.as_str().to_uppercase();
        let found = dir.lookup(&format!("  {shouted} "), now).unwrap();
        assert_eq!(found, room);
    }

    #[test]
    fn test_unknown_code() {
        let dir = directory();
        let err = dir.lookup("zzzz-zzzz", Timestamp::ZERO).unwrap_err();
        assert!(matches!(err, VroomError::NotFound(_)));
        assert!(err.is_user_visible());

        assert!(matches!(dir.lookup("  ", Timestamp::ZERO), Err(VroomError::InvalidInput(_))));
    }

    #[test]
    fn test_room_expires_without_use() {
        let dir = directory();
        let created = Timestamp::from_secs(0);
        let room = dir.create(created).unwrap();
        let code = room.join_code.as_str();

        assert!(dir.lookup(code, created + DAY * 30).is_ok());
        let err = dir.lookup(code, created + DAY * 31).unwrap_err();
        assert!(matches!(err, VroomError::Expired(_)));
    }

    #[test]
    fn test_touch_extends_life() {
        let dir = directory();
        let created = Timestamp::from_secs(0);
        let room = dir.create(created).unwrap();
        let code = room.join_code.as_str();

        assert!(dir.touch(&code.to_uppercase(), created + DAY * 20).unwrap());
        assert!(dir.lookup(code, created + DAY * 45).is_ok());
        assert!(!dir.touch("nope-nope", created).unwrap());
    }

    #[test]
    fn test_create_retries_on_collision() {
        let dir = directory();
        let taken = RoomCode::normalize("aaaa-aaaa").unwrap();
        let fresh = RoomCode::normalize("bbbb-bbbb").unwrap();
        dir.create_with(Timestamp::ZERO, || taken.clone()).unwrap();

        let mut calls = 0;
        let room = dir
            .create_with(Timestamp::ZERO, || {
                calls += 1;
                if calls < 3 { taken.clone() } else { fresh.clone() }
            })
            .unwrap();

        assert_eq!(room.join_code, fresh);
        assert_eq!(calls, 3);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_create_gives_up_after_max_attempts() {
        let dir = directory();
        let taken = RoomCode::normalize("aaaa-aaaa").unwrap();
        dir.create_with(Timestamp::ZERO, || taken.clone()).unwrap();

        let mut calls = 0;
        let err = dir
            .create_with(Timestamp::ZERO, || {
                calls += 1;
                taken.clone()
            })
            .unwrap_err();

        assert!(matches!(err, VroomError::Store(_)));
        assert_eq!(calls, MAX_CODE_ATTEMPTS);
    }
}

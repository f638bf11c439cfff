//! User directory for signed-in accounts

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vroom_core::{Timestamp, VroomError, VroomResult};

use crate::DisplayName;

/// What the auth provider tells us about a signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl AuthUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        AuthUser {
            user_id: user_id.into(),
            first_name: None,
            username: None,
        }
    }

    /// Name to seed a new profile with: first name, then username, then
    /// the account default
    pub fn initial_display_name(&self) -> DisplayName {
        [self.first_name.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|n| DisplayName::parse(n).ok())
            .unwrap_or_else(DisplayName::account_default)
    }
}

/// A stored user profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: u64,
    pub auth_id: String,
    pub display_name: DisplayName,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// User storage
pub trait UserDirectory: Send + Sync {
    /// Existing profile, or a new one seeded from the auth profile
    fn get_or_create(&self, user: &AuthUser, now: Timestamp) -> VroomResult<UserProfile>;

    fn get(&self, auth_id: &str) -> VroomResult<Option<UserProfile>>;

    /// Validate and store a new display name. `NotFound` if the user has no
    /// profile yet.
    fn update_display_name(&self, auth_id: &str, name: &str, now: Timestamp) -> VroomResult<UserProfile>;
}

/// In-memory user directory
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<String, UserProfile>>,
    next_id: AtomicU64,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn get_or_create(&self, user: &AuthUser, now: Timestamp) -> VroomResult<UserProfile> {
        let mut users = self.users.lock();
        let profile = users.entry(user.user_id.clone()).or_insert_with(|| {
            tracing::info!(auth_id = %user.user_id, "Creating user profile");
            UserProfile {
                id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                auth_id: user.user_id.clone(),
                display_name: user.initial_display_name(),
                created_at: now,
                updated_at: now,
            }
        });
        Ok(profile.clone())
    }

    fn get(&self, auth_id: &str) -> VroomResult<Option<UserProfile>> {
        Ok(self.users.lock().get(auth_id).cloned())
    }

    fn update_display_name(&self, auth_id: &str, name: &str, now: Timestamp) -> VroomResult<UserProfile> {
        let name = DisplayName::parse(name)?;
        let mut users = self.users.lock();
        let profile = users
            .get_mut(auth_id)
            .ok_or_else(|| VroomError::NotFound(format!("user {auth_id}")))?;

        profile.display_name = name;
        profile.updated_at = now;
        Ok(profile.clone())
    }
}

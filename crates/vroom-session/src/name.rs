//! Display names

use std::fmt;

use vroom_core::{VroomError, VroomResult};

/// Longest accepted display name, in characters
pub const MAX_DISPLAY_NAME_CHARS: usize = 255;

/// Name shown for guests who leave the field blank
pub const DEFAULT_GUEST_NAME: &str = "Guest";

/// Name given to accounts whose auth profile has none
pub const DEFAULT_USER_NAME: &str = "User";

/// Name given to participants the token endpoint knows nothing about
pub const DEFAULT_PARTICIPANT_NAME: &str = "Participant";

/// A trimmed display name of 1 to 255 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(input: &str) -> VroomResult<Self> {
        let trimmed = input.trim();
        let chars = trimmed.chars().count();
        if chars == 0 || chars > MAX_DISPLAY_NAME_CHARS {
            return Err(VroomError::InvalidInput(format!(
                "display name must be 1-{MAX_DISPLAY_NAME_CHARS} characters"
            )));
        }
        Ok(DisplayName(trimmed.to_string()))
    }

    /// Guest-entered name; blank input falls back to "Guest"
    pub fn guest(input: &str) -> VroomResult<Self> {
        if input.trim().is_empty() {
            return Ok(DisplayName(DEFAULT_GUEST_NAME.to_string()));
        }
        Self::parse(input)
    }

    /// Name a participant joins under: the requested name if usable, else
    /// the account's stored name, else "Participant"
    pub fn for_participant(requested: Option<&str>, account: Option<&DisplayName>) -> Self {
        requested
            .and_then(|n| Self::parse(n).ok())
            .or_else(|| account.cloned())
            .unwrap_or_else(|| DisplayName(DEFAULT_PARTICIPANT_NAME.to_string()))
    }

    /// "User", for accounts with nothing better
    pub fn account_default() -> Self {
        DisplayName(DEFAULT_USER_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

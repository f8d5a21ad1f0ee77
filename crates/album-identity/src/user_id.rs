//! Opaque user identifiers.
//!
//! User ids are assigned by the provisioning layer. The core only requires
//! them to be non-empty, bounded, and free of control characters so they can
//! be logged and used as storage keys safely.

use serde::{Deserialize, Serialize};

use crate::{IdentityError, Result};

/// Maximum user id length in bytes.
pub const MAX_USER_ID_LEN: usize = 128;

/// A validated user identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a validated user id.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidUserId` if the id is empty, longer than
    /// [`MAX_USER_ID_LEN`] bytes, or contains control characters.
    ///
    /// ```
    /// use album_identity::UserId;
    ///
    /// assert!(UserId::new("alice").is_ok());
    /// assert!(UserId::new("").is_err());
    /// assert!(UserId::new("bad\nid").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Validate a candidate id without allocating.
    pub fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(IdentityError::InvalidUserId {
                reason: "user id is empty".into(),
            });
        }
        if id.len() > MAX_USER_ID_LEN {
            return Err(IdentityError::InvalidUserId {
                reason: format!(
                    "user id too long: maximum {} bytes, got {}",
                    MAX_USER_ID_LEN,
                    id.len()
                ),
            });
        }
        if let Some(pos) = id.chars().position(char::is_control) {
            return Err(IdentityError::InvalidUserId {
                reason: format!("control character at position {}", pos),
            });
        }
        Ok(())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

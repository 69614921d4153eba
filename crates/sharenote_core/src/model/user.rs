//! User domain model.
//!
//! # Responsibility
//! - Define the registered-account record and its opaque identifier.
//!
//! # Invariants
//! - `id` and `username` are immutable once registered.
//! - `credential_hash` is opaque; it is never compared as plaintext and
//!   never rendered by `Display` implementations.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque stable identifier for a registered user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registered account record.
///
/// Serialized with camelCase keys so JSON stores keep the
/// `{ id, username, credentialHash }` layout.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Case-sensitive unique login name.
    pub username: String,
    /// PHC-format (or otherwise opaque) credential hash.
    pub credential_hash: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential_hash", &"<redacted>")
            .finish()
    }
}

/// Validation failures for persisted user records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    EmptyUsername,
    EmptyCredentialHash(UserId),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyCredentialHash(id) => {
                write!(f, "user {id} has an empty credential hash")
            }
        }
    }
}

impl Error for UserValidationError {}

impl User {
    /// Checks the shape invariants every stored user must satisfy.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.id.as_str().is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if self.username.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if self.credential_hash.is_empty() {
            return Err(UserValidationError::EmptyCredentialHash(self.id.clone()));
        }
        Ok(())
    }
}

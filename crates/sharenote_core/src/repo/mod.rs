//! Persistence backend contract and implementations.
//!
//! # Responsibility
//! - Define the `Backend` boundary: atomic full-state load and persist.
//! - Own the in-memory `Store` that services read and mutate through.
//! - Provide SQLite, JSON-file and in-memory backends.
//!
//! # Invariants
//! - `persist` is all-or-nothing from the caller's point of view.
//! - Loaded state is validated; invalid persisted data is rejected rather
//!   than masked.

use crate::db::DbError;
use crate::model::note::Note;
use crate::model::user::User;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod json_backend;
pub mod memory_backend;
pub mod sqlite_backend;
pub mod store;

pub use json_backend::JsonFileBackend;
pub use memory_backend::MemoryBackend;
pub use sqlite_backend::SqliteBackend;
pub use store::Store;

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reading or writing the durable collections.
#[derive(Debug)]
pub enum BackendError {
    Db(DbError),
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidData(String),
    Unavailable(&'static str),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o failed: {err}"),
            Self::Json(err) => write!(f, "storage document is malformed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Full contents of both collections, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl StoreState {
    /// Checks record shape, id/username uniqueness and owner references.
    pub fn validate(&self) -> BackendResult<()> {
        let mut user_ids = HashSet::new();
        let mut usernames = HashSet::new();
        for user in &self.users {
            user.validate()
                .map_err(|err| BackendError::InvalidData(err.to_string()))?;
            if !user_ids.insert(&user.id) {
                return Err(BackendError::InvalidData(format!(
                    "duplicate user id `{}`",
                    user.id
                )));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(BackendError::InvalidData(format!(
                    "duplicate username for user `{}`",
                    user.id
                )));
            }
        }

        let mut note_ids = HashSet::new();
        for note in &self.notes {
            note.validate()
                .map_err(|err| BackendError::InvalidData(err.to_string()))?;
            if !note_ids.insert(&note.id) {
                return Err(BackendError::InvalidData(format!(
                    "duplicate note id `{}`",
                    note.id
                )));
            }
            if let Some(owner_id) = note.owner_id.as_ref() {
                if !user_ids.contains(owner_id) {
                    return Err(BackendError::InvalidData(format!(
                        "note `{}` references unknown owner `{owner_id}`",
                        note.id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Durable storage for the user and note collections.
pub trait Backend {
    /// Short backend name used in log events.
    fn kind(&self) -> &'static str;
    /// Reads the full state. A fresh backend yields an empty state.
    fn load(&self) -> BackendResult<StoreState>;
    /// Replaces the full durable state; either fully applied or not observed.
    fn persist(&mut self, state: &StoreState) -> BackendResult<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn load(&self) -> BackendResult<StoreState> {
        (**self).load()
    }

    fn persist(&mut self, state: &StoreState) -> BackendResult<()> {
        (**self).persist(state)
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendError, StoreState};
    use crate::model::note::{Note, NoteId, GUEST_OWNER_LABEL};
    use crate::model::user::{User, UserId};

    fn user(id: &str, username: &str) -> User {
        User {
            id: UserId::new(id),
            username: username.to_string(),
            credential_hash: "hash".to_string(),
        }
    }

    fn note(id: &str, owner: Option<&str>) -> Note {
        Note {
            id: NoteId::new(id),
            content: "body".to_string(),
            owner_id: owner.map(UserId::new),
            owner_label: owner.unwrap_or(GUEST_OWNER_LABEL).to_string(),
            created_at: 1,
        }
    }

    #[test]
    fn validate_accepts_consistent_state() {
        let state = StoreState {
            users: vec![user("u1", "alice")],
            notes: vec![note("n1", Some("u1")), note("n2", None)],
        };
        assert!(state.validate().is_ok());
    }

    #[test]
    fn validate_rejects_dangling_owner_reference() {
        let state = StoreState {
            users: vec![user("u1", "alice")],
            notes: vec![note("n1", Some("u9"))],
        };
        let err = state.validate().unwrap_err();
        assert!(matches!(err, BackendError::InvalidData(message) if message.contains("u9")));
    }

    #[test]
    fn validate_rejects_duplicate_usernames_and_note_ids() {
        let dup_users = StoreState {
            users: vec![user("u1", "alice"), user("u2", "alice")],
            notes: Vec::new(),
        };
        assert!(dup_users.validate().is_err());

        let dup_notes = StoreState {
            users: Vec::new(),
            notes: vec![note("n1", None), note("n1", None)],
        };
        assert!(dup_notes.validate().is_err());
    }

    #[test]
    fn usernames_differing_only_in_case_are_distinct() {
        let state = StoreState {
            users: vec![user("u1", "alice"), user("u2", "Alice")],
            notes: Vec::new(),
        };
        assert!(state.validate().is_ok());
    }
}

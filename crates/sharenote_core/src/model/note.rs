//! Note domain model.
//!
//! # Responsibility
//! - Define the shared-note record and its opaque, URL-safe identifier.
//! - Provide content validation and list-preview helpers.
//!
//! # Invariants
//! - `content` is never blank and is stored byte-identically.
//! - `owner_label` is captured once at creation and never follows later
//!   username changes.
//! - Guest notes have `owner_id == None` and `owner_label == GUEST_OWNER_LABEL`.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Owner label recorded for notes created without an authenticated session.
pub const GUEST_OWNER_LABEL: &str = "guest";

/// Opaque stable identifier for a note; doubles as its read token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Raw note text, returned unchanged by raw views.
    pub content: String,
    /// `None` for guest-created notes, which nobody can delete.
    pub owner_id: Option<UserId>,
    /// Display name captured at creation time.
    pub owner_label: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Validation failures for note records and note input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyId,
    EmptyContent,
    GuestLabelMismatch(NoteId),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id must not be empty"),
            Self::EmptyContent => write!(f, "note content must not be empty"),
            Self::GuestLabelMismatch(id) => {
                write!(f, "unowned note {id} must carry the `{GUEST_OWNER_LABEL}` label")
            }
        }
    }
}

impl Error for NoteValidationError {}

impl Note {
    /// Checks the shape invariants every stored note must satisfy.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.id.as_str().is_empty() {
            return Err(NoteValidationError::EmptyId);
        }
        validate_content(&self.content)?;
        if self.owner_id.is_none() && self.owner_label != GUEST_OWNER_LABEL {
            return Err(NoteValidationError::GuestLabelMismatch(self.id.clone()));
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user_id)
    }

    pub fn is_guest(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Returns the first `max_chars` characters, suffixed with `...` when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Rejects empty and whitespace-only note content.
pub fn validate_content(content: &str) -> Result<(), NoteValidationError> {
    if content.trim().is_empty() {
        return Err(NoteValidationError::EmptyContent);
    }
    Ok(())
}

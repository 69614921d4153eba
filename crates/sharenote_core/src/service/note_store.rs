//! Note creation, lookup, listing and owner-only deletion.
//!
//! # Responsibility
//! - Allocate collision-free note ids and stamp ownership from the principal.
//!   The owner label is the stored username, not the principal's copy.
//! - Enforce that only a note's owner may delete it.
//!
//! # Invariants
//! - Create and delete report success only after the backend persisted.
//! - A rejected operation leaves the collection unchanged.
//! - Guest notes (`owner_id == None`) can never be deleted.
//! - `list_by_owner` is ordered by `created_at DESC`, newest insert first
//!   on ties.

use crate::error::ErrorKind;
use crate::ids::{allocate_unique, IdGenerator, IdPolicy};
use crate::model::note::{validate_content, Note, NoteId, GUEST_OWNER_LABEL};
use crate::model::principal::Principal;
use crate::model::user::UserId;
use crate::repo::{Backend, BackendError, Store};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from note store operations.
#[derive(Debug)]
pub enum NoteStoreError {
    /// Content is empty or whitespace only.
    EmptyContent,
    NotFound(NoteId),
    /// Note exists but the principal does not own it.
    Forbidden(NoteId),
    /// Authenticated principal no longer resolves to a stored user.
    UnknownOwner(UserId),
    /// Id generator kept colliding with existing notes.
    IdSpaceExhausted { attempts: u32 },
    Persistence(BackendError),
}

impl NoteStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyContent => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::UnknownOwner(_) => ErrorKind::Authentication,
            Self::IdSpaceExhausted { .. } => ErrorKind::Conflict,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for NoteStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "note content must not be empty"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Forbidden(id) => write!(f, "not permitted to delete note {id}"),
            Self::UnknownOwner(id) => write!(f, "owner does not exist: {id}"),
            Self::IdSpaceExhausted { attempts } => {
                write!(f, "could not allocate a unique note id after {attempts} attempts")
            }
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for NoteStoreError {
    fn from(value: BackendError) -> Self {
        Self::Persistence(value)
    }
}

/// Note operations over an injected id generator.
pub struct NoteStore<G: IdGenerator> {
    ids: G,
    id_policy: IdPolicy,
}

impl<G: IdGenerator> NoteStore<G> {
    pub fn new(ids: G) -> Self {
        Self::with_policy(ids, IdPolicy::notes())
    }

    pub fn with_policy(ids: G, id_policy: IdPolicy) -> Self {
        Self { ids, id_policy }
    }

    /// Creates a note owned by `principal` (or unowned for guests).
    ///
    /// # Errors
    /// - `EmptyContent` for blank input; nothing is written.
    /// - `UnknownOwner` when an authenticated principal has no user record.
    /// - `IdSpaceExhausted` when no free id was generated in budget.
    /// - `Persistence` when the backend rejected the write.
    pub fn create<B: Backend>(
        &self,
        store: &mut Store<B>,
        content: &str,
        principal: &Principal,
    ) -> Result<NoteId, NoteStoreError> {
        validate_content(content).map_err(|_| NoteStoreError::EmptyContent)?;

        let owner_id = principal.user_id().cloned();
        let created_at = now_epoch_ms();
        let id_policy = self.id_policy;

        let note_id = store.transact("note_create", |state| {
            let owner_label = match owner_id.as_ref() {
                Some(owner_id) => state
                    .users
                    .iter()
                    .find(|user| &user.id == owner_id)
                    .map(|user| user.username.clone())
                    .ok_or_else(|| NoteStoreError::UnknownOwner(owner_id.clone()))?,
                None => GUEST_OWNER_LABEL.to_string(),
            };
            let id = allocate_unique(&self.ids, id_policy, "notes", |candidate| {
                state.notes.iter().any(|note| note.id.as_str() == candidate)
            })
            .map(NoteId::new)
            .ok_or(NoteStoreError::IdSpaceExhausted {
                attempts: id_policy.max_attempts,
            })?;

            state.notes.push(Note {
                id: id.clone(),
                content: content.to_string(),
                owner_id: owner_id.clone(),
                owner_label,
                created_at,
            });
            Ok::<_, NoteStoreError>(id)
        })?;

        info!(
            "event=note_create module=notes status=ok note_id={} owned={} content_chars={}",
            note_id,
            principal.is_authenticated(),
            content.chars().count()
        );
        Ok(note_id)
    }

    /// Public lookup; the id itself is the read token.
    pub fn get<'s, B: Backend>(
        &self,
        store: &'s Store<B>,
        note_id: &NoteId,
    ) -> Result<&'s Note, NoteStoreError> {
        store
            .find_note(note_id)
            .ok_or_else(|| NoteStoreError::NotFound(note_id.clone()))
    }

    /// Notes owned by `owner_id`, newest first.
    pub fn list_by_owner<'s, B: Backend>(
        &self,
        store: &'s Store<B>,
        owner_id: &UserId,
    ) -> Vec<&'s Note> {
        let mut owned: Vec<(usize, &Note)> = store
            .notes()
            .iter()
            .enumerate()
            .filter(|(_, note)| note.is_owned_by(owner_id))
            .collect();
        owned.sort_by(|(left_pos, left), (right_pos, right)| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right_pos.cmp(left_pos))
        });
        owned.into_iter().map(|(_, note)| note).collect()
    }

    /// Deletes a note on behalf of its owner.
    ///
    /// # Errors
    /// - `NotFound` when no note has `note_id`.
    /// - `Forbidden` when the principal is anonymous or not the owner.
    /// - `Persistence` when the backend rejected the write; the note stays.
    pub fn delete<B: Backend>(
        &self,
        store: &mut Store<B>,
        note_id: &NoteId,
        principal: &Principal,
    ) -> Result<(), NoteStoreError> {
        let note = store
            .find_note(note_id)
            .ok_or_else(|| NoteStoreError::NotFound(note_id.clone()))?;

        let authorized = match principal {
            Principal::Authenticated { id, .. } => note.is_owned_by(id),
            Principal::Anonymous => false,
        };
        if !authorized {
            warn!(
                "event=note_delete module=notes status=forbidden note_id={} authenticated={}",
                note_id,
                principal.is_authenticated()
            );
            return Err(NoteStoreError::Forbidden(note_id.clone()));
        }

        store.transact("note_delete", |state| {
            let index = state
                .notes
                .iter()
                .position(|note| &note.id == note_id)
                .ok_or_else(|| NoteStoreError::NotFound(note_id.clone()))?;
            state.notes.remove(index);
            Ok::<(), NoteStoreError>(())
        })?;

        info!(
            "event=note_delete module=notes status=ok note_id={}",
            note_id
        );
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

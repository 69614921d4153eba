//! In-memory collections backed by a durable `Backend`.
//!
//! # Responsibility
//! - Load and validate the full state once at startup.
//! - Serve pure lookups from memory.
//! - Run every mutation as copy, modify, persist, then publish.
//!
//! # Invariants
//! - The published state always equals the last successfully persisted one.
//! - A failed mutation or a failed persist leaves the published state
//!   untouched.
//! - Mutations take `&mut self`; sharing a store across threads needs an
//!   outer mutex.

use crate::model::note::{Note, NoteId};
use crate::model::user::{User, UserId};
use crate::repo::{Backend, BackendError, BackendResult, StoreState};
use log::{error, info};
use std::time::Instant;

/// Owned handle over both collections and their backend.
pub struct Store<B: Backend> {
    backend: B,
    state: StoreState,
}

impl<B: Backend> Store<B> {
    /// Loads and validates persisted state.
    ///
    /// # Errors
    /// - Returns the backend error when the state cannot be read or fails
    ///   validation. Callers must treat this as fatal at startup.
    pub fn open(backend: B) -> BackendResult<Self> {
        let started_at = Instant::now();
        let kind = backend.kind();
        let loaded = backend.load().and_then(|state| {
            state.validate()?;
            Ok(state)
        });

        match loaded {
            Ok(state) => {
                info!(
                    "event=store_open module=store status=ok backend={} users={} notes={} duration_ms={}",
                    kind,
                    state.users.len(),
                    state.notes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(Self { backend, state })
            }
            Err(err) => {
                error!(
                    "event=store_open module=store status=error backend={} duration_ms={} error={}",
                    kind,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn users(&self) -> &[User] {
        &self.state.users
    }

    pub fn notes(&self) -> &[Note] {
        &self.state.notes
    }

    pub fn find_user(&self, id: &UserId) -> Option<&User> {
        self.state.users.iter().find(|user| &user.id == id)
    }

    /// Case-sensitive exact username match.
    pub fn find_user_by_username(&self, username: &str) -> Option<&User> {
        self.state
            .users
            .iter()
            .find(|user| user.username == username)
    }

    pub fn find_note(&self, id: &NoteId) -> Option<&Note> {
        self.state.notes.iter().find(|note| &note.id == id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Applies `mutate` to a copy of the state and persists it.
    ///
    /// The copy is published only after the backend accepted it, so callers
    /// never observe success for an unflushed write.
    pub fn transact<T, E>(
        &mut self,
        op: &'static str,
        mutate: impl FnOnce(&mut StoreState) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<BackendError>,
    {
        let mut next = self.state.clone();
        let output = mutate(&mut next)?;

        let started_at = Instant::now();
        if let Err(err) = self.backend.persist(&next) {
            error!(
                "event=store_persist module=store status=error op={} backend={} duration_ms={} error={}",
                op,
                self.backend.kind(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }

        info!(
            "event=store_persist module=store status=ok op={} backend={} users={} notes={} duration_ms={}",
            op,
            self.backend.kind(),
            next.users.len(),
            next.notes.len(),
            started_at.elapsed().as_millis()
        );
        self.state = next;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::model::note::{Note, NoteId, GUEST_OWNER_LABEL};
    use crate::repo::{BackendError, MemoryBackend, StoreState};

    fn guest_note(id: &str) -> Note {
        Note {
            id: NoteId::new(id),
            content: "body".to_string(),
            owner_id: None,
            owner_label: GUEST_OWNER_LABEL.to_string(),
            created_at: 10,
        }
    }

    #[test]
    fn transact_publishes_only_after_persist_succeeds() {
        let mut store = Store::open(MemoryBackend::new()).unwrap();
        store
            .transact("test_insert", |state| {
                state.notes.push(guest_note("n1"));
                Ok::<_, BackendError>(())
            })
            .unwrap();
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.backend().persisted().notes.len(), 1);

        store.backend_mut().fail_persists(true);
        let err = store
            .transact("test_insert", |state| {
                state.notes.push(guest_note("n2"));
                Ok::<_, BackendError>(())
            })
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
        assert_eq!(store.notes().len(), 1);
        assert!(store.find_note(&NoteId::new("n2")).is_none());
    }

    #[test]
    fn transact_skips_persist_when_mutation_fails() {
        let mut store = Store::open(MemoryBackend::new()).unwrap();
        let result: Result<(), BackendError> = store.transact("test_reject", |state| {
            state.notes.push(guest_note("n1"));
            Err(BackendError::InvalidData("rejected".to_string()))
        });
        assert!(result.is_err());
        assert!(store.notes().is_empty());
        assert_eq!(store.backend().persist_count(), 0);
    }

    #[test]
    fn open_rejects_invalid_persisted_state() {
        let state = StoreState {
            users: Vec::new(),
            notes: vec![guest_note("dup"), guest_note("dup")],
        };
        let result = Store::open(MemoryBackend::with_state(state));
        assert!(matches!(result, Err(BackendError::InvalidData(_))));
    }
}

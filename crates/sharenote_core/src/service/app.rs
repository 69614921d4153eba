//! Transport-agnostic application facade.
//!
//! # Responsibility
//! - Expose the user-facing flows (create, view, raw view, register, login,
//!   logout, list own notes, delete) over a `Session` slot.
//! - Compose identity resolution, store operations and link building.
//!
//! # Invariants
//! - Every flow resolves the principal from the session first; a stale
//!   session acts as a guest.
//! - Links are validated before a note is written, so a persisted note is
//!   never reported as a failure.

use crate::credential::{Argon2Hasher, CredentialHasher};
use crate::error::ErrorKind;
use crate::ids::{IdGenerator, IdPolicy, RandomIdGenerator};
use crate::link::{build_raw_link, build_share_link, LinkError, RequestOrigin};
use crate::model::note::{Note, NoteId};
use crate::model::principal::{Principal, Session};
use crate::model::user::UserId;
use crate::repo::{Backend, Store};
use crate::service::identity::IdentityResolver;
use crate::service::note_store::{NoteStore, NoteStoreError};
use crate::service::user_directory::{CredentialPolicy, UserDirectory, UserDirectoryError};
use crate::settings::Settings;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use url::Url;

/// Characters shown in a note list preview before `...`.
pub const NOTE_PREVIEW_CHARS: usize = 50;

#[derive(Debug)]
pub enum AppError {
    /// The flow needs an authenticated session.
    LoginRequired,
    Users(UserDirectoryError),
    Notes(NoteStoreError),
    Link(LinkError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LoginRequired => ErrorKind::Authentication,
            Self::Users(err) => err.kind(),
            Self::Notes(err) => err.kind(),
            Self::Link(err) => err.kind(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoginRequired => write!(f, "you need to log in to access this page"),
            Self::Users(err) => write!(f, "{err}"),
            Self::Notes(err) => write!(f, "{err}"),
            Self::Link(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LoginRequired => None,
            Self::Users(err) => Some(err),
            Self::Notes(err) => Some(err),
            Self::Link(err) => Some(err),
        }
    }
}

impl From<UserDirectoryError> for AppError {
    fn from(value: UserDirectoryError) -> Self {
        Self::Users(value)
    }
}

impl From<NoteStoreError> for AppError {
    fn from(value: NoteStoreError) -> Self {
        Self::Notes(value)
    }
}

impl From<LinkError> for AppError {
    fn from(value: LinkError) -> Self {
        Self::Link(value)
    }
}

/// Result of a successful note creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedNote {
    pub id: NoteId,
    pub share_link: Url,
    pub raw_link: Url,
}

/// Public view of one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    pub note: Note,
    pub share_link: Url,
    pub raw_link: Url,
}

/// Entry of the "my notes" list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: NoteId,
    pub preview: String,
    pub created_at: i64,
}

/// Collection sizes for health output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStatus {
    pub backend: &'static str,
    pub users: usize,
    pub notes: usize,
}

/// Id and credential rules applied by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppPolicy {
    pub note_ids: IdPolicy,
    pub user_ids: IdPolicy,
    pub credentials: CredentialPolicy,
}

impl Default for AppPolicy {
    fn default() -> Self {
        Self {
            note_ids: IdPolicy::notes(),
            user_ids: IdPolicy::users(),
            credentials: CredentialPolicy::default(),
        }
    }
}

impl From<&Settings> for AppPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            note_ids: settings.note_id_policy(),
            user_ids: settings.user_id_policy(),
            credentials: settings.credential_policy(),
        }
    }
}

/// Owns the store and capabilities behind every user-facing flow.
pub struct ShareNoteApp<B, H = Argon2Hasher, G = RandomIdGenerator>
where
    B: Backend,
    H: CredentialHasher,
    G: IdGenerator,
{
    store: Store<B>,
    hasher: H,
    ids: G,
    policy: AppPolicy,
}

impl<B: Backend> ShareNoteApp<B> {
    /// Production wiring: Argon2id hashing and random ids.
    pub fn with_defaults(store: Store<B>, policy: AppPolicy) -> Self {
        Self::new(store, Argon2Hasher::new(), RandomIdGenerator, policy)
    }
}

impl<B, H, G> ShareNoteApp<B, H, G>
where
    B: Backend,
    H: CredentialHasher,
    G: IdGenerator,
{
    pub fn new(store: Store<B>, hasher: H, ids: G, policy: AppPolicy) -> Self {
        Self {
            store,
            hasher,
            ids,
            policy,
        }
    }

    pub fn store(&self) -> &Store<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<B> {
        &mut self.store
    }

    /// Acting principal for `session`.
    pub fn principal(&self, session: &Session) -> Principal {
        IdentityResolver::new(&self.store).resolve_session(session)
    }

    /// Creates a note as whoever `session` resolves to.
    pub fn create_note(
        &mut self,
        session: &Session,
        text: &str,
        origin: &RequestOrigin,
    ) -> Result<CreatedNote, AppError> {
        origin.validate()?;
        let principal = self.principal(session);
        let notes = NoteStore::with_policy(&self.ids, self.policy.note_ids);
        let id = notes.create(&mut self.store, text, &principal)?;

        Ok(CreatedNote {
            share_link: build_share_link(origin, &id)?,
            raw_link: build_raw_link(origin, &id)?,
            id,
        })
    }

    /// Public note view; no session needed.
    pub fn view_note(&self, id: &NoteId, origin: &RequestOrigin) -> Result<NoteView, AppError> {
        let note = NoteStore::new(&self.ids).get(&self.store, id)?;
        Ok(NoteView {
            share_link: build_share_link(origin, id)?,
            raw_link: build_raw_link(origin, id)?,
            note: note.clone(),
        })
    }

    /// Bare note content, byte-identical to what was stored.
    pub fn view_raw(&self, id: &NoteId) -> Result<String, AppError> {
        let note = NoteStore::new(&self.ids).get(&self.store, id)?;
        Ok(note.content.clone())
    }

    /// Registers a user after checking the confirmation field.
    pub fn register(
        &mut self,
        username: &str,
        credential: &str,
        confirmation: &str,
    ) -> Result<UserId, AppError> {
        let directory = UserDirectory::with_policies(
            &self.hasher,
            &self.ids,
            self.policy.user_ids,
            self.policy.credentials,
        );
        Ok(directory.register_confirmed(&mut self.store, username, credential, confirmation)?)
    }

    /// Authenticates and binds the user to `session`.
    ///
    /// On failure the session is left as it was.
    pub fn login(
        &self,
        session: &mut Session,
        username: &str,
        credential: &str,
    ) -> Result<UserId, AppError> {
        let directory = UserDirectory::with_policies(
            &self.hasher,
            &self.ids,
            self.policy.user_ids,
            self.policy.credentials,
        );
        let user_id = directory.authenticate(&self.store, username, credential)?;
        session.bind(user_id.clone());
        Ok(user_id)
    }

    pub fn logout(&self, session: &mut Session) {
        if let Some(user_id) = session.user_id() {
            info!("event=user_logout module=app status=ok user_id={}", user_id);
        }
        session.clear();
    }

    /// Notes owned by the session's user, newest first.
    pub fn my_notes(&self, session: &Session) -> Result<Vec<NoteSummary>, AppError> {
        let principal = self.principal(session);
        let owner_id = principal.user_id().ok_or(AppError::LoginRequired)?;
        let summaries = NoteStore::new(&self.ids)
            .list_by_owner(&self.store, owner_id)
            .into_iter()
            .map(|note| NoteSummary {
                id: note.id.clone(),
                preview: note.preview(NOTE_PREVIEW_CHARS),
                created_at: note.created_at,
            })
            .collect();
        Ok(summaries)
    }

    /// Deletes a note if the session's user owns it.
    pub fn delete_note(&mut self, session: &Session, id: &NoteId) -> Result<(), AppError> {
        let principal = self.principal(session);
        let notes = NoteStore::with_policy(&self.ids, self.policy.note_ids);
        notes.delete(&mut self.store, id, &principal)?;
        Ok(())
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            backend: self.store.backend().kind(),
            users: self.store.users().len(),
            notes: self.store.notes().len(),
        }
    }
}

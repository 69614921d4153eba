//! User registration, authentication and lookup.
//!
//! # Responsibility
//! - Register users with unique case-sensitive usernames and hashed
//!   credentials.
//! - Authenticate username/credential pairs without revealing which half
//!   was wrong.
//!
//! # Invariants
//! - Registration returns success only after the new user was persisted.
//! - At most one user exists per exact username.
//! - Unknown username and wrong credential yield the same error after the
//!   same amount of hashing work.

use crate::credential::{CredentialHasher, HashError};
use crate::error::ErrorKind;
use crate::ids::{allocate_unique, IdGenerator, IdPolicy};
use crate::model::user::{User, UserId};
use crate::repo::{Backend, BackendError, Store};
use crate::service::identity::UserLookup;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum accepted credential length, in characters.
pub const MIN_CREDENTIAL_LENGTH: usize = 4;

/// Credential acceptance rules applied at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialPolicy {
    pub min_length: usize,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_CREDENTIAL_LENGTH,
        }
    }
}

/// Errors from user directory operations.
#[derive(Debug)]
pub enum UserDirectoryError {
    /// Username is blank.
    EmptyUsername,
    /// Credential shorter than the policy minimum.
    CredentialTooShort { min_length: usize },
    /// Confirmation differs from the credential.
    CredentialMismatch,
    /// Another user already registered this exact username.
    UsernameTaken(String),
    /// Unknown username or wrong credential.
    InvalidCredentials,
    UnknownUserId(UserId),
    UnknownUsername(String),
    /// Id generator kept colliding with existing users.
    IdSpaceExhausted { attempts: u32 },
    Hashing(HashError),
    Persistence(BackendError),
}

impl UserDirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyUsername | Self::CredentialTooShort { .. } | Self::CredentialMismatch => {
                ErrorKind::Validation
            }
            Self::UsernameTaken(_) | Self::IdSpaceExhausted { .. } => ErrorKind::Conflict,
            Self::InvalidCredentials => ErrorKind::Authentication,
            Self::UnknownUserId(_) | Self::UnknownUsername(_) => ErrorKind::NotFound,
            Self::Hashing(_) => ErrorKind::Internal,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for UserDirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::CredentialTooShort { min_length } => {
                write!(f, "password must be at least {min_length} characters")
            }
            Self::CredentialMismatch => write!(f, "password confirmation does not match"),
            Self::UsernameTaken(username) => write!(f, "username `{username}` is already taken"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::UnknownUserId(id) => write!(f, "user not found: {id}"),
            Self::UnknownUsername(username) => write!(f, "user not found: {username}"),
            Self::IdSpaceExhausted { attempts } => {
                write!(f, "could not allocate a unique user id after {attempts} attempts")
            }
            Self::Hashing(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserDirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hashing(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for UserDirectoryError {
    fn from(value: BackendError) -> Self {
        Self::Persistence(value)
    }
}

impl From<HashError> for UserDirectoryError {
    fn from(value: HashError) -> Self {
        Self::Hashing(value)
    }
}

/// User directory over an injected hasher and id generator.
pub struct UserDirectory<H: CredentialHasher, G: IdGenerator> {
    hasher: H,
    ids: G,
    id_policy: IdPolicy,
    credential_policy: CredentialPolicy,
}

impl<H: CredentialHasher, G: IdGenerator> UserDirectory<H, G> {
    pub fn new(hasher: H, ids: G) -> Self {
        Self::with_policies(hasher, ids, IdPolicy::users(), CredentialPolicy::default())
    }

    pub fn with_policies(
        hasher: H,
        ids: G,
        id_policy: IdPolicy,
        credential_policy: CredentialPolicy,
    ) -> Self {
        Self {
            hasher,
            ids,
            id_policy,
            credential_policy,
        }
    }

    /// Registers a new user and returns its id once persisted.
    ///
    /// # Errors
    /// - `EmptyUsername` / `CredentialTooShort` on invalid input.
    /// - `UsernameTaken` when the exact username exists.
    /// - `IdSpaceExhausted` when no free id was generated in budget.
    /// - `Persistence` when the backend rejected the write; nothing changes.
    pub fn register<B: Backend>(
        &self,
        store: &mut Store<B>,
        username: &str,
        raw_credential: &str,
    ) -> Result<UserId, UserDirectoryError> {
        if username.trim().is_empty() {
            return Err(UserDirectoryError::EmptyUsername);
        }
        self.check_credential(raw_credential)?;
        if store.find_user_by_username(username).is_some() {
            return Err(UserDirectoryError::UsernameTaken(username.to_string()));
        }

        let credential_hash = self.hasher.hash(raw_credential)?;
        let id_policy = self.id_policy;
        let user_id = store.transact("user_register", |state| {
            if state.users.iter().any(|user| user.username == username) {
                return Err(UserDirectoryError::UsernameTaken(username.to_string()));
            }
            let id = allocate_unique(&self.ids, id_policy, "users", |candidate| {
                state.users.iter().any(|user| user.id.as_str() == candidate)
            })
            .map(UserId::new)
            .ok_or(UserDirectoryError::IdSpaceExhausted {
                attempts: id_policy.max_attempts,
            })?;

            state.users.push(User {
                id: id.clone(),
                username: username.to_string(),
                credential_hash,
            });
            Ok(id)
        })?;

        info!(
            "event=user_register module=users status=ok user_id={}",
            user_id
        );
        Ok(user_id)
    }

    /// Registers after checking the credential against its confirmation.
    ///
    /// The length rule is reported before a mismatch.
    pub fn register_confirmed<B: Backend>(
        &self,
        store: &mut Store<B>,
        username: &str,
        raw_credential: &str,
        confirmation: &str,
    ) -> Result<UserId, UserDirectoryError> {
        self.check_credential(raw_credential)?;
        if raw_credential != confirmation {
            return Err(UserDirectoryError::CredentialMismatch);
        }
        self.register(store, username, raw_credential)
    }

    /// Verifies a username/credential pair.
    ///
    /// Exactly one hash verification runs per call, whether or not the
    /// username exists.
    pub fn authenticate<D: UserLookup + ?Sized>(
        &self,
        directory: &D,
        username: &str,
        raw_credential: &str,
    ) -> Result<UserId, UserDirectoryError> {
        let Some(user) = directory.user_by_username(username) else {
            match self.hasher.decoy_hash() {
                Ok(decoy) => {
                    self.hasher.verify(raw_credential, decoy);
                }
                Err(err) => warn!(
                    "event=user_authenticate module=users status=error error_code=decoy_unavailable error={}",
                    err
                ),
            }
            warn!("event=user_authenticate module=users status=rejected");
            return Err(UserDirectoryError::InvalidCredentials);
        };

        if !self.hasher.verify(raw_credential, &user.credential_hash) {
            warn!("event=user_authenticate module=users status=rejected");
            return Err(UserDirectoryError::InvalidCredentials);
        }

        info!(
            "event=user_authenticate module=users status=ok user_id={}",
            user.id
        );
        Ok(user.id.clone())
    }

    pub fn find_by_id<'d, D: UserLookup + ?Sized>(
        &self,
        directory: &'d D,
        id: &UserId,
    ) -> Result<&'d User, UserDirectoryError> {
        directory
            .user_by_id(id)
            .ok_or_else(|| UserDirectoryError::UnknownUserId(id.clone()))
    }

    pub fn find_by_username<'d, D: UserLookup + ?Sized>(
        &self,
        directory: &'d D,
        username: &str,
    ) -> Result<&'d User, UserDirectoryError> {
        directory
            .user_by_username(username)
            .ok_or_else(|| UserDirectoryError::UnknownUsername(username.to_string()))
    }

    fn check_credential(&self, raw_credential: &str) -> Result<(), UserDirectoryError> {
        let min_length = self.credential_policy.min_length;
        if raw_credential.chars().count() < min_length {
            return Err(UserDirectoryError::CredentialTooShort { min_length });
        }
        Ok(())
    }
}

//! Identity resolution for inbound sessions.
//!
//! # Responsibility
//! - Turn the transport's session slot into a `Principal`.
//!
//! # Invariants
//! - Never fails: an absent or stale session degrades to `Anonymous`.
//! - Read-only; never touches the backend.

use crate::model::principal::{Principal, Session};
use crate::model::user::{User, UserId};
use crate::repo::{Backend, Store};
use log::debug;

/// Read-only user lookups the resolver depends on.
pub trait UserLookup {
    fn user_by_id(&self, id: &UserId) -> Option<&User>;
    fn user_by_username(&self, username: &str) -> Option<&User>;
}

impl<B: Backend> UserLookup for Store<B> {
    fn user_by_id(&self, id: &UserId) -> Option<&User> {
        self.find_user(id)
    }

    fn user_by_username(&self, username: &str) -> Option<&User> {
        self.find_user_by_username(username)
    }
}

/// Resolves session tokens against a user directory.
pub struct IdentityResolver<'d, D: UserLookup + ?Sized> {
    directory: &'d D,
}

impl<'d, D: UserLookup + ?Sized> IdentityResolver<'d, D> {
    pub fn new(directory: &'d D) -> Self {
        Self { directory }
    }

    /// Resolves an optional session user id into the acting principal.
    pub fn resolve(&self, session_token: Option<&UserId>) -> Principal {
        let Some(user_id) = session_token else {
            return Principal::Anonymous;
        };

        match self.directory.user_by_id(user_id) {
            Some(user) => Principal::from_user(user),
            None => {
                debug!(
                    "event=identity_resolve module=identity status=stale_session user_id={}",
                    user_id
                );
                Principal::Anonymous
            }
        }
    }

    pub fn resolve_session(&self, session: &Session) -> Principal {
        self.resolve(session.user_id())
    }
}

//! Acting identity and session carrier.
//!
//! # Responsibility
//! - Model the principal every note operation runs under.
//! - Model the transport-owned session slot that login/logout write.
//!
//! # Invariants
//! - Authorization checks match on `Principal` exhaustively; there is no
//!   nullable "maybe user" shape.

use crate::model::user::{User, UserId};

/// Identity an operation acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Authenticated { id: UserId, username: String },
    Anonymous,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self::Authenticated {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated { id, .. } => Some(id),
            Self::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Session-scoped value slot supplied by the transport layer.
///
/// Holds the logged-in user id, or nothing for anonymous visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn bind(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    pub fn clear(&mut self) {
        self.user_id = None;
    }
}

//! Caller-facing error classification.
//!
//! Every service error maps onto one `ErrorKind` so presentation layers can
//! pick a message without matching on internal variants.

use std::fmt::{Display, Formatter};

/// Distinguishable outcome categories returned by core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input rejected before touching state (blank note, short credential).
    Validation,
    /// Uniqueness violated (username taken, id space exhausted).
    Conflict,
    /// Unknown user or wrong credential, deliberately merged.
    Authentication,
    /// Principal is not allowed to act on the target.
    Authorization,
    /// No entity with the given id.
    NotFound,
    /// Backend read/write failure.
    Persistence,
    /// Capability failure outside the store (credential hashing).
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Persistence => "persistence",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

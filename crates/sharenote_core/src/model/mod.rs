//! Domain model for users, notes and acting principals.
//!
//! # Responsibility
//! - Define the canonical records persisted by every storage backend.
//! - Define the principal/session shapes consumed by access checks.
//!
//! # Invariants
//! - `UserId` and `NoteId` are opaque and never reused within a collection.
//! - A note's owner is either an existing user or absent (guest note).

pub mod note;
pub mod principal;
pub mod user;

//! Core use-case services.
//!
//! # Responsibility
//! - Enforce identity, ownership and uniqueness rules above the store.
//! - Keep transport layers decoupled from storage details.
//!
//! # Invariants
//! - Services receive the store by reference per call; none hold global
//!   state.

pub mod app;
pub mod identity;
pub mod note_store;
pub mod user_directory;

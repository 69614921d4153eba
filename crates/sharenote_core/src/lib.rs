//! Core domain logic for ShareNote.
//! This crate is the single source of truth for note ownership, identity
//! resolution and persistence invariants.

pub mod credential;
pub mod db;
pub mod error;
pub mod ids;
pub mod link;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;

pub use credential::{Argon2Hasher, CredentialHasher, HashError};
pub use error::ErrorKind;
pub use ids::{IdGenerator, IdPolicy, RandomIdGenerator};
#[cfg(any(test, feature = "test-util"))]
pub use ids::SequenceIdGenerator;
pub use link::{build_raw_link, build_share_link, LinkError, RequestOrigin};
pub use logging::{
    default_log_level, init_from_settings, init_logging, logging_status, LoggingError,
};
pub use model::note::{Note, NoteId, GUEST_OWNER_LABEL};
pub use model::principal::{Principal, Session};
pub use model::user::{User, UserId};
pub use repo::{
    Backend, BackendError, BackendResult, JsonFileBackend, MemoryBackend, SqliteBackend, Store,
    StoreState,
};
pub use service::app::{
    AppError, AppPolicy, CreatedNote, NoteSummary, NoteView, ShareNoteApp, StoreStatus,
};
pub use service::identity::{IdentityResolver, UserLookup};
pub use service::note_store::{NoteStore, NoteStoreError};
pub use service::user_directory::{CredentialPolicy, UserDirectory, UserDirectoryError};
pub use settings::{Settings, SettingsError, StorageKind};

/// Opens the backend selected by `settings` behind a trait object.
///
/// # Errors
/// - Returns the backend error when the store file cannot be created,
///   migrated or parsed. Callers must not serve traffic in that case.
pub fn open_backend(settings: &Settings) -> BackendResult<Box<dyn Backend>> {
    let path = settings.storage.path.as_path();
    match settings.storage.backend {
        StorageKind::Sqlite => Ok(Box::new(SqliteBackend::open(path)?)),
        StorageKind::Json => Ok(Box::new(JsonFileBackend::open(path)?)),
    }
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, open_backend, Settings, StorageKind};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn open_backend_follows_storage_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();

        settings.storage.path = dir.path().join("store.db");
        assert_eq!(open_backend(&settings).unwrap().kind(), "sqlite");

        settings.storage.backend = StorageKind::Json;
        settings.storage.path = dir.path().join("db.json");
        assert_eq!(open_backend(&settings).unwrap().kind(), "json");
        assert!(settings.storage.path.exists());
    }
}

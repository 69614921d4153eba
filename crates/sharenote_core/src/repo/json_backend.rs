//! JSON document backend.
//!
//! # Responsibility
//! - Persist both collections as one `{ "users": [...], "notes": [...] }`
//!   document.
//! - Make every write atomic through write-to-temp then rename.
//!
//! # Invariants
//! - A reader never sees a half-written document: the target path is only
//!   ever replaced by a fully written and synced temporary file.
//! - A persist returns only after the containing directory is synced, so the
//!   rename itself is durable.
//! - Opening a missing or empty file initializes it with the empty state.

use crate::repo::{Backend, BackendResult, StoreState};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Store backend over a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Opens the document at `path`, creating it with empty collections when
    /// it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let mut backend = Self {
            path: path.as_ref().to_path_buf(),
        };
        if let Some(parent) = backend.parent_dir() {
            fs::create_dir_all(parent)?;
        }

        let needs_init = match fs::read_to_string(&backend.path) {
            Ok(text) => text.trim().is_empty(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
            Err(err) => return Err(err.into()),
        };
        if needs_init {
            backend.persist(&StoreState::default())?;
            info!(
                "event=json_init module=store status=ok path={}",
                backend.path.display()
            );
        }

        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }
}

impl Backend for JsonFileBackend {
    fn kind(&self) -> &'static str {
        "json"
    }

    fn load(&self) -> BackendResult<StoreState> {
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(StoreState::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn persist(&mut self, state: &StoreState) -> BackendResult<()> {
        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), state)?;
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        sync_dir(dir)?;
        Ok(())
    }
}

/// Flushes the directory entry so the rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

/// No portable directory handle to sync outside unix.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{sync_dir, JsonFileBackend};
    use crate::model::note::{Note, NoteId, GUEST_OWNER_LABEL};
    use crate::repo::{Backend, BackendError, StoreState};
    use std::fs;

    #[test]
    fn open_initializes_missing_file_with_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");

        let backend = JsonFileBackend::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(backend.load().unwrap(), StoreState::default());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["users"], serde_json::json!([]));
        assert_eq!(raw["notes"], serde_json::json!([]));
    }

    #[test]
    fn persist_writes_camel_case_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let mut backend = JsonFileBackend::open(&path).unwrap();

        let state = StoreState {
            users: Vec::new(),
            notes: vec![Note {
                id: NoteId::new("abcd1234"),
                content: "line one\nline two".to_string(),
                owner_id: None,
                owner_label: GUEST_OWNER_LABEL.to_string(),
                created_at: 1_700_000_000_000,
            }],
        };
        backend.persist(&state).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["notes"][0]["ownerId"], serde_json::Value::Null);
        assert_eq!(raw["notes"][0]["createdAt"], 1_700_000_000_000_i64);
        assert_eq!(backend.load().unwrap(), state);

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temporary file must be renamed away");
    }

    #[test]
    fn repeated_persist_syncs_containing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let mut backend = JsonFileBackend::open(&path).unwrap();

        backend.persist(&StoreState::default()).unwrap();
        backend.persist(&StoreState::default()).unwrap();

        assert_eq!(backend.load().unwrap(), StoreState::default());
        sync_dir(dir.path()).unwrap();
        #[cfg(unix)]
        assert!(sync_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn load_reports_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();

        let backend = JsonFileBackend::open(&path).unwrap();
        assert!(matches!(backend.load(), Err(BackendError::Json(_))));
    }
}

//! SQLite-backed store backend.
//!
//! # Responsibility
//! - Map `StoreState` onto the `users` and `notes` tables.
//! - Replace both tables inside a single immediate transaction.
//!
//! # Invariants
//! - `position` columns preserve collection insertion order across reloads.
//! - Users are written before notes and deleted after them, so the
//!   `notes.owner_id` foreign key holds at every statement.

use crate::db::{open_db, open_db_in_memory};
use crate::model::note::{Note, NoteId};
use crate::model::user::{User, UserId};
use crate::repo::{Backend, BackendError, BackendResult, StoreState};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::path::Path;

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    credential_hash
FROM users
ORDER BY position ASC;";

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    content,
    owner_id,
    owner_label,
    created_at
FROM notes
ORDER BY position ASC;";

/// Store backend over a migrated SQLite connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (creating if needed) and migrates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> BackendResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Backend for SqliteBackend {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn load(&self) -> BackendResult<StoreState> {
        let mut users = Vec::new();
        let mut stmt = self.conn.prepare(USER_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        let mut notes = Vec::new();
        let mut stmt = self.conn.prepare(NOTE_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(StoreState { users, notes })
    }

    fn persist(&mut self, state: &StoreState) -> BackendResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM notes;", [])?;
        tx.execute("DELETE FROM users;", [])?;

        {
            let mut insert_user = tx.prepare(
                "INSERT INTO users (id, username, credential_hash, position)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (position, user) in state.users.iter().enumerate() {
                insert_user.execute(params![
                    user.id.as_str(),
                    user.username.as_str(),
                    user.credential_hash.as_str(),
                    position_to_db(position)?,
                ])?;
            }

            let mut insert_note = tx.prepare(
                "INSERT INTO notes (id, content, owner_id, owner_label, created_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for (position, note) in state.notes.iter().enumerate() {
                insert_note.execute(params![
                    note.id.as_str(),
                    note.content.as_str(),
                    note.owner_id.as_ref().map(UserId::as_str),
                    note.owner_label.as_str(),
                    note.created_at,
                    position_to_db(position)?,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> BackendResult<User> {
    let user = User {
        id: UserId::new(row.get::<_, String>("id")?),
        username: row.get("username")?,
        credential_hash: row.get("credential_hash")?,
    };
    user.validate()
        .map_err(|err| BackendError::InvalidData(format!("users row: {err}")))?;
    Ok(user)
}

fn parse_note_row(row: &Row<'_>) -> BackendResult<Note> {
    let note = Note {
        id: NoteId::new(row.get::<_, String>("id")?),
        content: row.get("content")?,
        owner_id: row.get::<_, Option<String>>("owner_id")?.map(UserId::new),
        owner_label: row.get("owner_label")?,
        created_at: row.get("created_at")?,
    };
    note.validate()
        .map_err(|err| BackendError::InvalidData(format!("notes row: {err}")))?;
    Ok(note)
}

fn position_to_db(position: usize) -> BackendResult<i64> {
    i64::try_from(position)
        .map_err(|_| BackendError::InvalidData(format!("position {position} out of range")))
}

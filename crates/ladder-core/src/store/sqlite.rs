//! Relational ladder backend on `SQLite`.
//!
//! One table holds every group's ladder, keyed by the composite
//! `(group_id, user_id)`. Reads are rank-ordered queries; the batch upsert
//! runs inside a single database transaction so a partial batch can never
//! become visible.

// SQLite row ids and ranks are i64 end to end, so no narrowing occurs here.
// Mutex poisoning means another thread panicked mid-operation; there is no
// recovery from that, so lock() failures are allowed to propagate the panic.
#![allow(clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};

use super::{Entry, LadderStore, StoreError};

/// Schema executed on every open; all statements are idempotent.
const SCHEMA: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS ladder (
    id INTEGER NOT NULL PRIMARY KEY,
    group_id TEXT,
    user_id TEXT,
    rank INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_ladder_group_user
    ON ladder(group_id, user_id);
";

/// Relational ladder store.
///
/// The table layout is fixed (`id`, `group_id`, `user_id`, `rank`) and is
/// created on open if absent, so a fresh file and a previously-populated one
/// open identically.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates the ladder database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::backend("opening sqlite ladder database", e))?;

        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory store, used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::backend("opening in-memory ladder database", e))?;

        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::backend("creating ladder table", e))
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: Some(row.get(0)?),
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        rank: row.get(3)?,
    })
}

/// Insert-or-update against whatever connection (or open transaction) the
/// caller holds. An existing `(group, user)` row keeps its id and only has
/// its rank rewritten; anything else would churn row identifiers on every
/// promotion.
fn upsert_on(conn: &Connection, entry: &Entry) -> Result<(), StoreError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM ladder WHERE group_id = ?1 AND user_id = ?2",
            params![entry.group_id, entry.user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::backend("looking up ladder entry for upsert", e))?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE ladder SET rank = ?1 WHERE id = ?2",
                params![entry.rank, id],
            )
            .map_err(|e| StoreError::backend("updating ladder entry rank", e))?;
        }
        None => {
            conn.execute(
                "INSERT INTO ladder (group_id, user_id, rank) VALUES (?1, ?2, ?3)",
                params![entry.group_id, entry.user_id, entry.rank],
            )
            .map_err(|e| StoreError::backend("inserting ladder entry", e))?;
        }
    }

    Ok(())
}

impl LadderStore for SqliteStore {
    fn entry(&self, group_id: &str, user_id: &str) -> Result<Entry, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, group_id, user_id, rank FROM ladder
             WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
            row_to_entry,
        )
        .optional()
        .map_err(|e| StoreError::backend("selecting ladder entry", e))?
        .ok_or(StoreError::NotFound)
    }

    fn entry_above(&self, group_id: &str, rank: i64) -> Result<Entry, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, group_id, user_id, rank FROM ladder
             WHERE group_id = ?1 AND rank = ?2",
            params![group_id, rank - 1],
            row_to_entry,
        )
        .optional()
        .map_err(|e| StoreError::backend("selecting ladder entry above rank", e))?
        .ok_or(StoreError::NotFound)
    }

    fn last_entry(&self, group_id: &str) -> Result<Entry, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, group_id, user_id, rank FROM ladder
             WHERE group_id = ?1 ORDER BY rank DESC LIMIT 1",
            params![group_id],
            row_to_entry,
        )
        .optional()
        .map_err(|e| StoreError::backend("selecting bottom ladder entry", e))?
        .ok_or(StoreError::NotFound)
    }

    fn ladder(&self, group_id: &str) -> Result<Vec<Entry>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, group_id, user_id, rank FROM ladder
                 WHERE group_id = ?1 ORDER BY rank ASC",
            )
            .map_err(|e| StoreError::backend("preparing ladder listing", e))?;

        let entries = stmt
            .query_map(params![group_id], row_to_entry)
            .map_err(|e| StoreError::backend("listing ladder", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::backend("reading ladder rows", e))?;

        if entries.is_empty() {
            return Err(StoreError::NotFound);
        }

        Ok(entries)
    }

    fn groups(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT DISTINCT group_id FROM ladder ORDER BY group_id")
            .map_err(|e| StoreError::backend("preparing group enumeration", e))?;

        let groups = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| StoreError::backend("enumerating ladder groups", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::backend("reading ladder group rows", e));
        groups
    }

    fn clear_ladder(&self, group_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM ladder WHERE group_id = ?1", params![group_id])
            .map_err(|e| StoreError::backend("clearing ladder", e))?;

        Ok(())
    }

    fn remove_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM ladder WHERE group_id = ?1 AND user_id = ?2",
            params![entry.group_id, entry.user_id],
        )
        .map_err(|e| StoreError::backend("removing ladder entry", e))?;

        Ok(())
    }

    fn upsert_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        upsert_on(&conn, entry)
    }

    fn upsert_ladder(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::backend("beginning ladder batch transaction", e))?;

        for entry in entries {
            upsert_on(&tx, entry)?;
        }

        tx.commit()
            .map_err(|e| StoreError::backend("committing ladder batch transaction", e))
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => mutex
                .into_inner()
                .unwrap()
                .close()
                .map_err(|(_, e)| StoreError::backend("closing sqlite ladder database", e)),
            // Another handle is still alive; the connection closes when the
            // last one drops.
            Err(_) => Ok(()),
        }
    }
}

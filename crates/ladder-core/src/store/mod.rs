//! Ladder persistence: the storage contract and its backends.
//!
//! Every backend stores [`Entry`] records and must satisfy the
//! [`LadderStore`] contract identically: the same `NotFound` sentinel on
//! absence, the same ascending-by-rank ordering from [`LadderStore::ladder`],
//! and the same all-or-nothing guarantee from
//! [`LadderStore::upsert_ladder`]. The ranking engine never sees which
//! backend it is talking to.
//!
//! Two backends are provided:
//!
//! - [`redb::RedbStore`]: embedded ordered key-value store, one partition
//!   per group, keyed by user id.
//! - [`sqlite::SqliteStore`]: one relational table keyed by
//!   `(group_id, user_id)`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod redb;
pub mod sqlite;


/// Errors produced by ladder storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The targeted group, entry, or rank position does not exist.
    ///
    /// This is a distinguished outcome, not an operational failure: callers
    /// branch on it to tell "nothing above the top rank" or "ladder never
    /// created" apart from real storage trouble.
    #[error("not found")]
    NotFound,

    /// An underlying storage, serialization, or transaction failure.
    #[error("{context}: {source}")]
    Backend {
        /// What the store was doing when the failure occurred.
        context: String,
        /// The originating backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl StoreError {
    /// Wraps a backend error with the operation that was being attempted.
    pub fn backend(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for the `NotFound` sentinel.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// One participant's position in one group's ladder.
///
/// Ranks are zero-based and 0 is the top of the ladder. Within a group the
/// ranks of all entries always form the contiguous range `0..N-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Backend-assigned row identifier.
    ///
    /// Only the relational backend assigns one; the partition backend keys
    /// entries by user id and leaves this `None`. Never serialized into
    /// partition values.
    #[serde(skip)]
    pub id: Option<i64>,

    /// The group whose ladder this entry belongs to.
    pub group_id: String,

    /// The participant; unique within a group.
    pub user_id: String,

    /// Zero-based position, 0 = top.
    pub rank: i64,
}

impl Entry {
    /// Creates an entry with no backend identifier assigned yet.
    #[must_use]
    pub fn new(group_id: impl Into<String>, user_id: impl Into<String>, rank: i64) -> Self {
        Self {
            id: None,
            group_id: group_id.into(),
            user_id: user_id.into(),
            rank,
        }
    }
}

/// The capability set every ladder backend must provide.
///
/// Implementations must be behaviorally indistinguishable from one another:
/// the ranking engine is written against this trait alone, and a bulk
/// transfer may replay one backend's contents into the other.
pub trait LadderStore {
    /// Looks up one entry by its `(group, user)` composite key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such entry exists.
    fn entry(&self, group_id: &str, user_id: &str) -> Result<Entry, StoreError>;

    /// Returns the entry ranked directly above `rank` (that is, at
    /// `rank - 1`) in the group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when `rank` is already the top or
    /// the group/rank does not exist.
    fn entry_above(&self, group_id: &str, rank: i64) -> Result<Entry, StoreError>;

    /// Returns the bottom entry (maximum rank) of the group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the group has no entries.
    fn last_entry(&self, group_id: &str) -> Result<Entry, StoreError>;

    /// Returns the group's full ladder, ascending by rank.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the group has no entries, whether
    /// its partition was never created or has been emptied; both states
    /// surface as the same error kind.
    fn ladder(&self, group_id: &str) -> Result<Vec<Entry>, StoreError>;

    /// Enumerates every group known to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the enumeration itself fails; an empty store
    /// yields an empty list, not an error.
    fn groups(&self) -> Result<Vec<String>, StoreError>;

    /// Destroys every entry in the group. Idempotent: succeeds without
    /// error when the group never existed.
    ///
    /// # Errors
    ///
    /// Returns an error only on operational failure.
    fn clear_ladder(&self, group_id: &str) -> Result<(), StoreError>;

    /// Deletes one entry by its `(group, user)` key. Idempotent: succeeds
    /// without error when the entry is already absent.
    ///
    /// # Errors
    ///
    /// Returns an error only on operational failure.
    fn remove_entry(&self, entry: &Entry) -> Result<(), StoreError>;

    /// Inserts the entry, or replaces the existing one with the same
    /// `(group, user)` key, updating its rank.
    ///
    /// The relational backend keeps the existing row id on replacement; the
    /// partition backend creates the group's partition lazily on first
    /// insert.
    ///
    /// # Errors
    ///
    /// Returns an error on operational failure.
    fn upsert_entry(&self, entry: &Entry) -> Result<(), StoreError>;

    /// Applies a sequence of upserts atomically: after this returns, either
    /// every entry is visible or none is.
    ///
    /// # Errors
    ///
    /// Returns an error on operational failure; a failure part-way through
    /// rolls the whole batch back.
    fn upsert_ladder(&self, entries: &[Entry]) -> Result<(), StoreError>;

    /// Releases the underlying storage handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Which concrete backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Relational table via `SQLite`.
    Sqlite,
    /// Embedded ordered partition store via redb.
    Redb,
}

/// Opens the selected backend at `path` and hands it back behind the
/// contract.
///
/// # Errors
///
/// Returns an error if the underlying database cannot be opened or
/// initialized.
pub fn open(backend: Backend, path: &Path) -> Result<Box<dyn LadderStore>, StoreError> {
    match backend {
        Backend::Sqlite => Ok(Box::new(sqlite::SqliteStore::open(path)?)),
        Backend::Redb => Ok(Box::new(redb::RedbStore::open(path)?)),
    }
}

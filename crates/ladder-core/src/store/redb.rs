//! Ordered-partition ladder backend on redb.
//!
//! One redb table per group: key = user id, value = the entry serialized as
//! JSON (`group_id`, `user_id`, `rank`; the user key doubles as the
//! identifier, so there is no separate row id). Partitions are created
//! lazily by the first upsert for an unseen group, and
//! [`LadderStore::clear_ladder`] drops the whole partition. The batch upsert
//! applies every write inside one write transaction and commits once;
//! dropping the transaction on failure discards the partial batch.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle};

use super::{Entry, LadderStore, StoreError};

/// The per-group table: user id -> JSON entry.
fn group_table(group_id: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(group_id)
}

fn decode_entry(bytes: &[u8]) -> Result<Entry, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::backend("deserializing ladder entry", e))
}

fn encode_entry(entry: &Entry) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(entry).map_err(|e| StoreError::backend("serializing ladder entry", e))
}

/// Ordered-partition ladder store.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens or creates the ladder database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| StoreError::backend("opening redb ladder database", e))?;

        Ok(Self { db })
    }

    /// Reads the group's full partition, unsorted.
    ///
    /// A missing partition and an existing-but-empty one both come back as
    /// `NotFound`, matching the relational backend's zero-rows behavior.
    fn read_partition(&self, group_id: &str) -> Result<Vec<Entry>, StoreError> {
        let read = self
            .db
            .begin_read()
            .map_err(|e| StoreError::backend("beginning read transaction", e))?;

        let table = match read.open_table(group_table(group_id)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Err(StoreError::NotFound),
            Err(e) => {
                return Err(StoreError::backend(
                    format!("opening ladder partition for group {group_id}"),
                    e,
                ));
            }
        };

        let mut entries = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| StoreError::backend("iterating ladder partition", e))?;
        for item in iter {
            let (_, value) =
                item.map_err(|e| StoreError::backend("reading ladder partition entry", e))?;
            entries.push(decode_entry(value.value())?);
        }

        if entries.is_empty() {
            return Err(StoreError::NotFound);
        }

        Ok(entries)
    }
}

impl LadderStore for RedbStore {
    fn entry(&self, group_id: &str, user_id: &str) -> Result<Entry, StoreError> {
        let read = self
            .db
            .begin_read()
            .map_err(|e| StoreError::backend("beginning read transaction", e))?;

        let table = match read.open_table(group_table(group_id)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Err(StoreError::NotFound),
            Err(e) => {
                return Err(StoreError::backend(
                    format!("opening ladder partition for group {group_id}"),
                    e,
                ));
            }
        };

        let value = table
            .get(user_id)
            .map_err(|e| StoreError::backend("looking up ladder entry", e))?
            .ok_or(StoreError::NotFound)?;

        decode_entry(value.value())
    }

    fn entry_above(&self, group_id: &str, rank: i64) -> Result<Entry, StoreError> {
        self.read_partition(group_id)?
            .into_iter()
            .find(|entry| entry.rank == rank - 1)
            .ok_or(StoreError::NotFound)
    }

    fn last_entry(&self, group_id: &str) -> Result<Entry, StoreError> {
        self.read_partition(group_id)?
            .into_iter()
            .max_by_key(|entry| entry.rank)
            .ok_or(StoreError::NotFound)
    }

    fn ladder(&self, group_id: &str) -> Result<Vec<Entry>, StoreError> {
        // Partitions iterate in user-key order, not rank order.
        let mut entries = self.read_partition(group_id)?;
        entries.sort_by_key(|entry| entry.rank);
        Ok(entries)
    }

    fn groups(&self) -> Result<Vec<String>, StoreError> {
        let read = self
            .db
            .begin_read()
            .map_err(|e| StoreError::backend("beginning read transaction", e))?;

        let mut names: Vec<String> = read
            .list_tables()
            .map_err(|e| StoreError::backend("enumerating ladder partitions", e))?
            .map(|handle| handle.name().to_string())
            .collect();
        names.sort();

        Ok(names)
    }

    fn clear_ladder(&self, group_id: &str) -> Result<(), StoreError> {
        let write = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend("beginning write transaction", e))?;

        // Returns false when the partition never existed; both outcomes are
        // a successful clear.
        write
            .delete_table(group_table(group_id))
            .map_err(|e| StoreError::backend("deleting ladder partition", e))?;

        write
            .commit()
            .map_err(|e| StoreError::backend("committing ladder clear", e))
    }

    fn remove_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        // Opening a table in a write transaction creates it, so probe first:
        // deleting from a group that never existed must not conjure an empty
        // partition into the groups() enumeration.
        {
            let read = self
                .db
                .begin_read()
                .map_err(|e| StoreError::backend("beginning read transaction", e))?;
            match read.open_table(group_table(&entry.group_id)) {
                Ok(_) => {}
                Err(TableError::TableDoesNotExist(_)) => return Ok(()),
                Err(e) => {
                    return Err(StoreError::backend(
                        format!("opening ladder partition for group {}", entry.group_id),
                        e,
                    ));
                }
            }
        }

        let write = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend("beginning write transaction", e))?;

        {
            let mut table = write
                .open_table(group_table(&entry.group_id))
                .map_err(|e| StoreError::backend("opening ladder partition", e))?;
            table
                .remove(entry.user_id.as_str())
                .map_err(|e| StoreError::backend("removing ladder entry", e))?;
        }

        write
            .commit()
            .map_err(|e| StoreError::backend("committing ladder entry removal", e))
    }

    fn upsert_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let write = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend("beginning write transaction", e))?;

        {
            let mut table = write
                .open_table(group_table(&entry.group_id))
                .map_err(|e| StoreError::backend("opening ladder partition", e))?;
            let value = encode_entry(entry)?;
            table
                .insert(entry.user_id.as_str(), value.as_slice())
                .map_err(|e| StoreError::backend("writing ladder entry", e))?;
        }

        write
            .commit()
            .map_err(|e| StoreError::backend("committing ladder entry", e))
    }

    fn upsert_ladder(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let write = self
            .db
            .begin_write()
            .map_err(|e| StoreError::backend("beginning write transaction", e))?;

        for entry in entries {
            let mut table = write
                .open_table(group_table(&entry.group_id))
                .map_err(|e| StoreError::backend("opening ladder partition", e))?;
            let value = encode_entry(entry)?;
            table
                .insert(entry.user_id.as_str(), value.as_slice())
                .map_err(|e| StoreError::backend("writing ladder entry", e))?;
        }

        write
            .commit()
            .map_err(|e| StoreError::backend("committing ladder batch", e))
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        // redb persists on drop; there is no explicit shutdown call.
        drop(self.db);
        Ok(())
    }
}

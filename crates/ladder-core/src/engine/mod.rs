//! The ranking engine.
//!
//! Pure functions over the [`LadderStore`] contract: rank lookup, promotion,
//! challenge resolution, join/leave compaction, shuffle, and one-shot bulk
//! transfer between backends. The engine holds no state of its own: it
//! reads entries, computes the mutated ladder in memory, and writes the
//! result back, batching every multi-row mutation through
//! [`LadderStore::upsert_ladder`] so an interrupted operation can never
//! leave a group with a rank gap or a duplicate.
//!
//! This is the only layer allowed to treat [`StoreError::NotFound`] as a
//! legitimate outcome, and only in two places: "nothing above me" (a
//! top-ranked challenger) and "ladder not yet created" (the first join, or
//! an empty partition met during transfer). Everything else propagates to
//! the caller unchanged.

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::store::{Entry, LadderStore, StoreError};

#[cfg(test)]
mod tests;

/// A user's position within their group, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// The user's ladder entry.
    pub entry: Entry,
    /// Total number of entries in the group.
    pub ladder_size: usize,
}

impl Standing {
    /// The 1-based rank shown to users (rank 0 displays as 1).
    #[must_use]
    pub const fn display_rank(&self) -> i64 {
        self.entry.rank + 1
    }
}

/// Looks up a user's current standing in a group.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the user is not ranked in the group,
/// or any operational failure from the backend.
pub fn standing(
    store: &dyn LadderStore,
    group_id: &str,
    user_id: &str,
) -> Result<Standing, StoreError> {
    let entry = store.entry(group_id, user_id)?;
    let ladder_size = store.ladder(group_id)?.len();

    Ok(Standing { entry, ladder_size })
}

/// Returns the group's full ladder, ascending by rank.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the group has no ladder.
pub fn board(store: &dyn LadderStore, group_id: &str) -> Result<Vec<Entry>, StoreError> {
    store.ladder(group_id)
}

/// Records a win for `user_id`, swapping ranks with the entry directly
/// above.
///
/// Both rewritten entries are persisted in one atomic batch; writing them
/// independently could strand the ladder with a duplicated rank if the
/// process died between the two writes. A winner already at rank 0 is a
/// no-op.
///
/// Returns the winner's new 1-based display rank, or `None` when there was
/// nothing to win.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the user is not ranked in the group,
/// or any operational failure from the backend.
pub fn record_win(
    store: &dyn LadderStore,
    group_id: &str,
    user_id: &str,
) -> Result<Option<i64>, StoreError> {
    let mut winner = store.entry(group_id, user_id)?;

    // Already the champion.
    if winner.rank == 0 {
        return Ok(None);
    }

    let mut loser = store.entry_above(group_id, winner.rank)?;
    std::mem::swap(&mut winner.rank, &mut loser.rank);

    let new_rank = winner.rank + 1;
    store.upsert_ladder(&[winner, loser])?;

    Ok(Some(new_rank))
}

/// Resolves who `user_id` would challenge: the entry directly above them.
///
/// A top-ranked challenger has no one to challenge; that is a normal
/// terminal case, reported as `Ok(None)` rather than an error.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the challenger is not ranked in the
/// group, or any operational failure from the backend.
pub fn challenge(
    store: &dyn LadderStore,
    group_id: &str,
    user_id: &str,
) -> Result<Option<Entry>, StoreError> {
    let challenger = store.entry(group_id, user_id)?;

    match store.entry_above(group_id, challenger.rank) {
        Ok(above) => Ok(Some(above)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Appends a newcomer to the bottom of the group's ladder.
///
/// A group with no ladder yet behaves as if its last rank were -1, so the
/// first member lands on rank 0.
///
/// # Errors
///
/// Returns any operational failure from the backend.
pub fn join(store: &dyn LadderStore, group_id: &str, user_id: &str) -> Result<Entry, StoreError> {
    let last_rank = match store.last_entry(group_id) {
        Ok(entry) => entry.rank,
        Err(StoreError::NotFound) => -1,
        Err(e) => return Err(e),
    };

    let entry = Entry::new(group_id, user_id, last_rank + 1);
    store.upsert_entry(&entry)?;

    Ok(entry)
}

/// Removes a departing user and renumbers the remaining entries to close
/// the gap.
///
/// Compaction is stable (survivors keep their relative order, only their
/// rank values shift down) and is persisted as one atomic batch.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the group has no ladder, or any
/// operational failure from the backend.
pub fn leave(store: &dyn LadderStore, group_id: &str, user_id: &str) -> Result<(), StoreError> {
    let entries = store.ladder(group_id)?;

    let mut remaining = Vec::with_capacity(entries.len().saturating_sub(1));
    let mut rank = 0;
    for mut entry in entries {
        if entry.user_id == user_id {
            store.remove_entry(&entry)?;
            continue;
        }

        entry.rank = rank;
        rank += 1;
        remaining.push(entry);
    }

    store.upsert_ladder(&remaining)
}

/// Discards the group's ladder and deals every eligible member a fresh
/// random rank.
///
/// Each member draws candidate ranks from `0..M` until one is unclaimed
/// (rejection sampling), which yields a uniform random permutation with no
/// two members sharing a rank. The full assignment is persisted as one
/// atomic batch, and the resulting ladder is returned ascending by rank.
///
/// # Errors
///
/// Returns any operational failure from the backend.
pub fn shuffle(
    store: &dyn LadderStore,
    group_id: &str,
    members: &[String],
) -> Result<Vec<Entry>, StoreError> {
    store.clear_ladder(group_id)?;

    if members.is_empty() {
        return Ok(Vec::new());
    }

    let mut rng = rand::thread_rng();
    let count = members.len() as i64;
    let mut claimed: HashSet<i64> = HashSet::with_capacity(members.len());
    let mut assigned = Vec::with_capacity(members.len());

    for member in members {
        let rank = loop {
            let candidate = rng.gen_range(0..count);
            if claimed.insert(candidate) {
                break candidate;
            }
        };
        assigned.push(Entry::new(group_id, member, rank));
    }

    store.upsert_ladder(&assigned)?;
    store.ladder(group_id)
}

/// Copies every group's ladder from `source` into `dest`, unchanged.
///
/// One-shot migration between backend types, not a live sync: each group is
/// read in full and replayed through one atomic batch write. A group whose
/// partition exists but holds no entries is skipped.
///
/// # Errors
///
/// Returns any operational failure from either backend.
pub fn transfer(source: &dyn LadderStore, dest: &dyn LadderStore) -> Result<(), StoreError> {
    let groups = source.groups()?;
    debug!(groups = groups.len(), "transferring ladders");

    for group_id in groups {
        let entries = match source.ladder(&group_id) {
            Ok(entries) => entries,
            Err(StoreError::NotFound) => continue,
            Err(e) => return Err(e),
        };

        debug!(group = %group_id, entries = entries.len(), "copying ladder");
        dest.upsert_ladder(&entries)?;
    }

    Ok(())
}

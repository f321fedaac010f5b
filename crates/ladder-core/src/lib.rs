//! Per-group ranking ladders.
//!
//! A ladder is a strict linear ranking of the participants in one group.
//! Rank 0 is the top, and ranks stay contiguous: every mutation (a won
//! challenge, a join, a departure, a reshuffle) must leave the group's rank
//! set equal to `0..N-1`.
//!
//! The crate is split along the storage seam:
//!
//! - [`store`]: the [`store::LadderStore`] contract plus two interchangeable
//!   backends, an embedded ordered key-value store with one partition per
//!   group ([`store::redb::RedbStore`]) and a relational table keyed by
//!   group/user ([`store::sqlite::SqliteStore`]).
//! - [`engine`]: the ranking algorithms (promotion, challenge, join/leave
//!   compaction, shuffle, bulk transfer), written purely against the contract
//!   so either backend can be swapped in at startup.
//! - [`rating`]: a standalone Elo-style rating calculation, independent of
//!   the ladder state.
//!
//! # Example
//!
//! ```rust,no_run
//! use ladder_core::engine;
//! use ladder_core::store::{self, Backend};
//!
//! # fn example() -> Result<(), ladder_core::store::StoreError> {
//! let store = store::open(Backend::Sqlite, "ladder.db".as_ref())?;
//! engine::join(store.as_ref(), "general", "alice")?;
//! engine::join(store.as_ref(), "general", "bob")?;
//!
//! // bob beat the player above him
//! let new_rank = engine::record_win(store.as_ref(), "general", "bob")?;
//! assert_eq!(new_rank, Some(1));
//! store.close()?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod rating;
pub mod store;

pub use store::{Entry, LadderStore, StoreError};

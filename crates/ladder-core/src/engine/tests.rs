//! Tests for the ranking engine, run against both backends.

use std::collections::HashSet;

use tempfile::TempDir;

use super::*;
use crate::store::redb::RedbStore;
use crate::store::sqlite::SqliteStore;

struct Fixture {
    name: &'static str,
    store: Box<dyn LadderStore>,
    _dir: Option<TempDir>,
}

fn backends() -> Vec<Fixture> {
    let dir = TempDir::new().expect("failed to create temp dir");
    let redb = RedbStore::open(dir.path().join("ladder.redb"))
        .expect("failed to open redb store");
    let sqlite = SqliteStore::in_memory().expect("failed to open sqlite store");

    vec![
        Fixture {
            name: "sqlite",
            store: Box::new(sqlite),
            _dir: None,
        },
        Fixture {
            name: "redb",
            store: Box::new(redb),
            _dir: Some(dir),
        },
    ]
}

fn seed(store: &dyn LadderStore, group_id: &str, users: &[&str]) {
    for (rank, user_id) in users.iter().enumerate() {
        store
            .upsert_entry(&Entry::new(group_id, *user_id, rank as i64))
            .expect("failed to seed entry");
    }
}

fn user_order(store: &dyn LadderStore, group_id: &str) -> Vec<String> {
    store
        .ladder(group_id)
        .expect("failed to list ladder")
        .into_iter()
        .map(|e| e.user_id)
        .collect()
}

/// Asserts the group's ranks are exactly `0..N-1` with no duplicates.
fn assert_contiguous(store: &dyn LadderStore, group_id: &str, backend: &str) {
    let ladder = store.ladder(group_id).expect("failed to list ladder");
    let ranks: Vec<i64> = ladder.iter().map(|e| e.rank).collect();
    let expected: Vec<i64> = (0..ladder.len() as i64).collect();
    assert_eq!(
        ranks, expected,
        "{backend}: ranks in {group_id} must be contiguous from 0"
    );
}

#[test]
fn standing_reports_display_rank_and_ladder_size() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol"]);

        let standing = standing(store, "general", "bob").expect("failed to get standing");
        assert_eq!(standing.entry.rank, 1, "{}", fixture.name);
        assert_eq!(standing.display_rank(), 2, "{}", fixture.name);
        assert_eq!(standing.ladder_size, 3, "{}", fixture.name);
    }
}

#[test]
fn standing_of_unranked_user_is_not_found() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice"]);

        let result = standing(store, "general", "nobody");
        assert!(
            matches!(result, Err(StoreError::NotFound)),
            "{}",
            fixture.name
        );
    }
}

#[test]
fn record_win_swaps_with_the_entry_above() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol"]);

        let new_rank = record_win(store, "general", "carol").expect("failed to record win");
        assert_eq!(new_rank, Some(2), "{}", fixture.name);

        assert_eq!(
            user_order(store, "general"),
            vec!["alice", "carol", "bob"],
            "{}",
            fixture.name
        );
        assert_contiguous(store, "general", fixture.name);
    }
}

#[test]
fn record_win_at_top_is_a_no_op() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol"]);

        let new_rank = record_win(store, "general", "alice").expect("failed to record win");
        assert_eq!(new_rank, None, "{}", fixture.name);

        assert_eq!(
            user_order(store, "general"),
            vec!["alice", "bob", "carol"],
            "{}: a champion's win must leave the ladder unchanged",
            fixture.name
        );
    }
}

#[test]
fn record_win_climbs_to_the_top_one_step_at_a_time() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol"]);

        assert_eq!(
            record_win(store, "general", "carol").expect("win failed"),
            Some(2),
            "{}",
            fixture.name
        );
        assert_eq!(
            record_win(store, "general", "carol").expect("win failed"),
            Some(1),
            "{}",
            fixture.name
        );
        assert_eq!(
            record_win(store, "general", "carol").expect("win failed"),
            None,
            "{}",
            fixture.name
        );

        assert_eq!(
            user_order(store, "general"),
            vec!["carol", "alice", "bob"],
            "{}",
            fixture.name
        );
    }
}

#[test]
fn record_win_for_unranked_user_is_not_found() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice"]);

        let result = record_win(store, "general", "nobody");
        assert!(
            matches!(result, Err(StoreError::NotFound)),
            "{}",
            fixture.name
        );
    }
}

#[test]
fn challenge_names_the_entry_above() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol"]);

        let challenged = challenge(store, "general", "carol").expect("failed to challenge");
        let challenged = challenged.expect("carol has someone above her");
        assert_eq!(challenged.user_id, "bob", "{}", fixture.name);
        assert_eq!(challenged.rank, 1, "{}", fixture.name);
    }
}

#[test]
fn challenge_from_the_top_is_a_silent_no_op() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob"]);

        let challenged = challenge(store, "general", "alice").expect("failed to challenge");
        assert_eq!(challenged, None, "{}", fixture.name);
    }
}

#[test]
fn join_on_an_empty_group_starts_at_rank_zero() {
    for fixture in backends() {
        let store = fixture.store.as_ref();

        let entry = join(store, "general", "alice").expect("failed to join");
        assert_eq!(entry.rank, 0, "{}", fixture.name);
        assert_contiguous(store, "general", fixture.name);
    }
}

#[test]
fn join_appends_to_the_bottom() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob"]);

        let entry = join(store, "general", "carol").expect("failed to join");
        assert_eq!(entry.rank, 2, "{}", fixture.name);

        assert_eq!(
            user_order(store, "general"),
            vec!["alice", "bob", "carol"],
            "{}",
            fixture.name
        );
        assert_contiguous(store, "general", fixture.name);
    }
}

#[test]
fn leave_compacts_and_preserves_relative_order() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol", "dave"]);

        leave(store, "general", "bob").expect("failed to leave");

        assert_eq!(
            user_order(store, "general"),
            vec!["alice", "carol", "dave"],
            "{}",
            fixture.name
        );
        assert_contiguous(store, "general", fixture.name);
    }
}

#[test]
fn leave_of_the_last_member_empties_the_ladder() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice"]);

        leave(store, "general", "alice").expect("failed to leave");

        assert!(
            matches!(store.ladder("general"), Err(StoreError::NotFound)),
            "{}",
            fixture.name
        );
    }
}

#[test]
fn leave_from_a_group_without_a_ladder_is_not_found() {
    for fixture in backends() {
        let result = leave(fixture.store.as_ref(), "nowhere", "alice");
        assert!(
            matches!(result, Err(StoreError::NotFound)),
            "{}",
            fixture.name
        );
    }
}

#[test]
fn shuffle_deals_distinct_ranks_spanning_the_member_count() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        let members: Vec<String> = ["alice", "bob", "carol", "dave", "erin"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let ladder = shuffle(store, "general", &members).expect("failed to shuffle");

        assert_eq!(ladder.len(), members.len(), "{}", fixture.name);
        let ranks: HashSet<i64> = ladder.iter().map(|e| e.rank).collect();
        assert_eq!(
            ranks,
            (0..members.len() as i64).collect(),
            "{}: ranks must be pairwise distinct and span 0..M-1",
            fixture.name
        );
        let users: HashSet<&str> = ladder.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users.len(), members.len(), "{}", fixture.name);
        assert_contiguous(store, "general", fixture.name);
    }
}

#[test]
fn shuffle_replaces_the_previous_ladder() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob", "carol"]);

        let members = vec!["dave".to_string(), "erin".to_string()];
        let ladder = shuffle(store, "general", &members).expect("failed to shuffle");

        assert_eq!(ladder.len(), 2, "{}", fixture.name);
        assert!(
            matches!(store.entry("general", "alice"), Err(StoreError::NotFound)),
            "{}: the old ladder must be gone",
            fixture.name
        );
    }
}

#[test]
fn shuffle_with_no_members_leaves_an_empty_ladder() {
    for fixture in backends() {
        let store = fixture.store.as_ref();
        seed(store, "general", &["alice", "bob"]);

        let ladder = shuffle(store, "general", &[]).expect("failed to shuffle");

        assert!(ladder.is_empty(), "{}", fixture.name);
        assert!(
            matches!(store.ladder("general"), Err(StoreError::NotFound)),
            "{}",
            fixture.name
        );
    }
}

#[test]
fn transfer_copies_every_group_in_both_directions() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let redb = RedbStore::open(dir.path().join("ladder.redb"))
        .expect("failed to open redb store");
    let sqlite = SqliteStore::in_memory().expect("failed to open sqlite store");

    seed(&sqlite, "general", &["alice", "bob", "carol"]);
    seed(&sqlite, "dev", &["dave", "erin"]);

    transfer(&sqlite, &redb).expect("failed to transfer sqlite -> redb");

    for group in ["general", "dev"] {
        assert_eq!(
            user_order(&sqlite, group),
            user_order(&redb, group),
            "destination ladder must equal the source for group {group}"
        );
    }

    // And back the other way, into a fresh relational store.
    let sqlite_back = SqliteStore::in_memory().expect("failed to open sqlite store");
    seed(&redb, "random", &["frank"]);
    transfer(&redb, &sqlite_back).expect("failed to transfer redb -> sqlite");

    for group in ["general", "dev", "random"] {
        assert_eq!(
            user_order(&redb, group),
            user_order(&sqlite_back, group),
            "destination ladder must equal the source for group {group}"
        );
    }
}

#[test]
fn contiguity_holds_across_a_mixed_operation_sequence() {
    for fixture in backends() {
        let store = fixture.store.as_ref();

        for user in ["alice", "bob", "carol", "dave", "erin"] {
            join(store, "general", user).expect("failed to join");
            assert_contiguous(store, "general", fixture.name);
        }

        record_win(store, "general", "erin").expect("failed to record win");
        assert_contiguous(store, "general", fixture.name);

        leave(store, "general", "carol").expect("failed to leave");
        assert_contiguous(store, "general", fixture.name);

        record_win(store, "general", "dave").expect("failed to record win");
        assert_contiguous(store, "general", fixture.name);

        leave(store, "general", "alice").expect("failed to leave");
        assert_contiguous(store, "general", fixture.name);

        let members: Vec<String> = user_order(store, "general");
        shuffle(store, "general", &members).expect("failed to shuffle");
        assert_contiguous(store, "general", fixture.name);
    }
}

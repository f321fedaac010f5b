//! Command handlers: invoke one engine operation and report the outcome.
//!
//! `NotFound` on a read is a user-facing condition ("not ranked"), not an
//! operational failure, so it prints a plain message instead of an error
//! chain. Everything else propagates with context for diagnostics.

use anyhow::{Context, Result};
use ladder_core::engine;
use ladder_core::store::{LadderStore, StoreError};
use tracing::info;

pub fn board(store: &dyn LadderStore, group: &str) -> Result<()> {
    match engine::board(store, group) {
        Ok(entries) => {
            for entry in entries {
                println!("{}\t{}", entry.user_id, entry.rank + 1);
            }
            Ok(())
        }
        Err(StoreError::NotFound) => {
            println!("{group} has no ladder yet");
            Ok(())
        }
        Err(e) => Err(e).context("failed to list board"),
    }
}

pub fn rank(store: &dyn LadderStore, group: &str, user: &str) -> Result<()> {
    match engine::standing(store, group, user) {
        Ok(standing) => {
            println!("{user}\t{}/{}", standing.display_rank(), standing.ladder_size);
            Ok(())
        }
        Err(StoreError::NotFound) => {
            println!("{user} is not ranked in {group}");
            Ok(())
        }
        Err(e) => Err(e).context("failed to look up rank"),
    }
}

pub fn won(store: &dyn LadderStore, group: &str, user: &str) -> Result<()> {
    match engine::record_win(store, group, user) {
        Ok(Some(new_rank)) => {
            println!("New rank {new_rank}");
            Ok(())
        }
        Ok(None) => {
            println!("{user} already holds the top rank");
            Ok(())
        }
        Err(StoreError::NotFound) => {
            println!("{user} is not ranked in {group}");
            Ok(())
        }
        Err(e) => Err(e).context("failed to record win"),
    }
}

pub fn challenge(store: &dyn LadderStore, group: &str, user: &str) -> Result<()> {
    match engine::challenge(store, group, user) {
        Ok(Some(challenged)) => {
            println!("{} has been challenged by {user}", challenged.user_id);
            Ok(())
        }
        Ok(None) => {
            println!("{user} holds the top rank; there is no one to challenge");
            Ok(())
        }
        Err(StoreError::NotFound) => {
            println!("{user} is not ranked in {group}");
            Ok(())
        }
        Err(e) => Err(e).context("failed to resolve challenge"),
    }
}

pub fn join(store: &dyn LadderStore, group: &str, user: &str) -> Result<()> {
    let entry = engine::join(store, group, user).context("failed to join ladder")?;
    println!("{user} joined {group} at rank {}", entry.rank + 1);
    Ok(())
}

pub fn leave(store: &dyn LadderStore, group: &str, user: &str) -> Result<()> {
    match engine::leave(store, group, user) {
        Ok(()) => {
            println!("{user} left {group}");
            Ok(())
        }
        Err(StoreError::NotFound) => {
            println!("{group} has no ladder yet");
            Ok(())
        }
        Err(e) => Err(e).context("failed to leave ladder"),
    }
}

pub fn shuffle(store: &dyn LadderStore, group: &str, members: &[String]) -> Result<()> {
    let entries = engine::shuffle(store, group, members).context("failed to shuffle ladder")?;
    for entry in entries {
        println!("{}\t{}", entry.user_id, entry.rank + 1);
    }
    Ok(())
}

pub fn transfer(source: &dyn LadderStore, dest: &dyn LadderStore) -> Result<()> {
    engine::transfer(source, dest).context("failed to transfer ladders")?;
    info!("transfer complete");
    Ok(())
}

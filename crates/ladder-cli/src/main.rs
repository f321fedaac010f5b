//! ladder - per-group ranking ladder manager
//!
//! Opens one of the interchangeable storage backends, runs a single ranking
//! operation against it, and closes the store on every exit path. The
//! `transfer` subcommand performs the one-shot bulk copy between backend
//! types.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ladder_core::store::{self, Backend, LadderStore};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// ladder - per-group ranking ladder manager
#[derive(Parser, Debug)]
#[command(name = "ladder")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Storage backend
    #[arg(long, value_enum, default_value_t = BackendArg::Sqlite)]
    database: BackendArg,

    /// Path to the database file
    #[arg(long, default_value = "ladder.db")]
    filename: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Relational table via SQLite
    Sqlite,
    /// Embedded ordered partition store via redb
    Redb,
}

impl BackendArg {
    const fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Redb => "redb",
        }
    }
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sqlite => Self::Sqlite,
            BackendArg::Redb => Self::Redb,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a group's ladder, top first
    Board {
        /// Group id
        group: String,
    },

    /// Show a user's current rank in a group
    Rank {
        /// Group id
        group: String,
        /// User id
        user: String,
    },

    /// Record a win, moving the user up one rung
    Won {
        /// Group id
        group: String,
        /// User id
        user: String,
    },

    /// Show who the user would challenge next
    Challenge {
        /// Group id
        group: String,
        /// User id
        user: String,
    },

    /// Add a user to the bottom of a group's ladder
    Join {
        /// Group id
        group: String,
        /// User id
        user: String,
    },

    /// Remove a user and close the gap they leave
    Leave {
        /// Group id
        group: String,
        /// User id
        user: String,
    },

    /// Re-deal a group's ranks as a uniform random permutation
    Shuffle {
        /// Group id
        group: String,
        /// Eligible member ids
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Copy every ladder into another backend (one-shot migration)
    Transfer {
        /// Destination backend
        #[arg(long, value_enum)]
        to: BackendArg,
        /// Destination database file
        #[arg(long, default_value = "ladder-out.db")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let store = store::open(cli.database.into(), &cli.filename).with_context(|| {
        format!(
            "failed to open {} database at {}",
            cli.database.name(),
            cli.filename.display()
        )
    })?;

    // The store must be released on every exit path, including after a
    // failed command, so the outcome is held until close has run.
    let outcome = run(&cli.command, store.as_ref());
    let closed = store.close();

    outcome?;
    closed.context("failed to close database")?;

    Ok(())
}

fn run(command: &Commands, store: &dyn LadderStore) -> Result<()> {
    match command {
        Commands::Board { group } => commands::board(store, group),
        Commands::Rank { group, user } => commands::rank(store, group, user),
        Commands::Won { group, user } => commands::won(store, group, user),
        Commands::Challenge { group, user } => commands::challenge(store, group, user),
        Commands::Join { group, user } => commands::join(store, group, user),
        Commands::Leave { group, user } => commands::leave(store, group, user),
        Commands::Shuffle { group, members } => commands::shuffle(store, group, members),
        Commands::Transfer { to, output } => {
            let dest = store::open((*to).into(), output).with_context(|| {
                format!("failed to open destination database at {}", output.display())
            })?;

            let result = commands::transfer(store, dest.as_ref());
            let closed = dest.close();

            result?;
            closed.context("failed to close destination database")?;
            Ok(())
        }
    }
}

//! Operator CLI for Conference Central.
//!
//! # Responsibility
//! - Run maintenance jobs against the configured database, most notably the
//!   periodic announcement refresh.
//! - Inspect the durable task queue.

use anyhow::Context;
use clap::{Parser, Subcommand};
use conference_core::{
    init_from_config, open_db_with_busy_timeout, ConferenceApi, CoreConfig, FixedIdentity,
    SqliteCache, SqliteTaskQueue,
};
use log::info;

#[derive(Parser)]
#[command(name = "conference")]
#[command(about = "Conference Central maintenance commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path; overrides CONFERENCE_DB_PATH
    #[arg(long, global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core linkage status
    Ping,

    /// Rebuild the cached "nearly sold out" announcement
    RefreshAnnouncement,

    /// Print the cached announcement
    Announcement,

    /// List queued tasks that have not completed
    PendingTasks {
        /// Maximum number of tasks to print
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = CoreConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_from_config(&config).context("failed to initialize logging")?;

    if let Commands::Ping = cli.command {
        println!("conference_core ping={}", conference_core::ping());
        println!("conference_core version={}", conference_core::core_version());
        return Ok(());
    }

    let conn = open_db_with_busy_timeout(&config.db_path, config.busy_timeout())
        .with_context(|| format!("failed to open database `{}`", config.db_path))?;
    let identity = FixedIdentity::anonymous();
    let queue = SqliteTaskQueue::new(&conn);
    let cache = SqliteCache::new(&conn);
    let api = ConferenceApi::new(&conn, &identity, &queue, &cache).with_config(&config);

    match cli.command {
        Commands::Ping => {}
        Commands::RefreshAnnouncement => {
            let announcement = api.refresh_announcement()?;
            info!(
                "event=cli_command module=cli status=ok command=refresh-announcement empty={}",
                announcement.is_empty()
            );
            println!("{announcement}");
        }
        Commands::Announcement => {
            println!("{}", api.get_announcement()?);
        }
        Commands::PendingTasks { limit } => {
            for task in queue.pending(limit)? {
                println!("{}", serde_json::to_string(&task)?);
            }
        }
    }

    Ok(())
}

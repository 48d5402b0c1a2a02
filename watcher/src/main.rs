//! Issue watch
//!
//! Polls GitHub for newly created issues matching the configured qualifiers
//! and sends a digest of them. Meant to be started by a scheduler (cron,
//! systemd timer) or left running with `watch`.
//!
//! # Usage
//!
//! ```bash
//! issue-watch                       # one run
//! issue-watch watch --interval 900  # run every 15 minutes
//! issue-watch status                # show the last recorded run
//! issue-watch query                 # show the next search query
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use issue_watch::checkpoint::{CheckpointStore, FsCheckpointStore};
use issue_watch::{build_job, gh, logging, Config};

#[derive(Parser)]
#[command(name = "issue-watch")]
#[command(about = "Notify about newly created GitHub issues")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (default: search for .issue-watch.toml)
    #[arg(long, short, global = true, env = "ISSUE_WATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search-and-notify cycle (default)
    Run,
    /// Run cycles continuously until interrupted
    Watch {
        /// Seconds between the end of one run and the start of the next
        #[arg(long, short, default_value_t = 900)]
        interval: u64,
    },
    /// Show the last recorded run
    Status,
    /// Print the query the next run would send
    Query,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing()?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            check_gh(&config).await;
            // A failed run is already logged; the scheduler only sees success
            build_job(&config).run().await;
        }
        Commands::Watch { interval } => {
            check_gh(&config).await;
            build_job(&config)
                .watch(Duration::from_secs(interval))
                .await?;
        }
        Commands::Status => {
            let store = FsCheckpointStore::new(config.job.checkpoint_file.clone());
            match store.load()? {
                Some(checkpoint) => {
                    println!("Last run:   {}", checkpoint.job_id());
                    println!("Started:    {} UTC", checkpoint.start_time());
                    println!("Finished:   {} UTC", checkpoint.end_time());
                    println!("Duration:   {} ms", checkpoint.duration_ms());
                }
                None => println!(
                    "No completed run recorded in {}",
                    store.path().display()
                ),
            }
        }
        Commands::Query => {
            println!("{}", build_job(&config).preview_query()?);
        }
    }

    Ok(())
}

/// Warn early when gh is unusable; the run itself reports the real failure
async fn check_gh(config: &Config) {
    if let Err(e) = gh::check_gh_available(config.github.host.as_deref()).await {
        tracing::warn!("gh CLI check failed: {}", e);
    }
}

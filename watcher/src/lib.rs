//! Issue watch library
//!
//! Polls GitHub for issues created since the previous run and sends a single
//! digest notification when any are found.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use issue_watch::{build_job, Config};
//!
//! let config = Config::load(None)?;
//! let outcome = build_job(&config).run().await;
//! ```
//!
//! # Requirements
//! - `gh` CLI installed and authenticated (`gh auth login`)
//! - a sendmail-compatible binary for the `email_smtp` channel

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod gh;
pub mod job;
pub mod logging;
pub mod notify;
pub mod provider;
pub mod query;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointStore, FsCheckpointStore};
pub use config::Config;
pub use error::{DeliveryError, ProviderError, StorageError, WatchError};
pub use job::{PollingJob, RunOutcome, Stage};
pub use types::{Issue, Repository};

use notify::{
    EmailChannel, IssueFormatter, NotificationChannel, NotificationOrchestrator,
    PlainTextFormatter, SendmailTransport, SlackWebhookChannel,
};
use provider::GhIssueProvider;

/// Build the notification orchestrator with every strategy the config enables
///
/// Registration order: email first, then Slack (only when a webhook URL is set).
pub fn build_notifier(config: &Config) -> NotificationOrchestrator {
    let formatters: Vec<Box<dyn IssueFormatter>> = vec![Box::new(PlainTextFormatter)];

    let email = &config.notification.email;
    let mut channels: Vec<Box<dyn NotificationChannel>> = vec![Box::new(EmailChannel::new(
        Box::new(SendmailTransport::new(
            email.sendmail_command.clone(),
            email.sendmail_args.clone(),
        )),
    ))];
    if let Some(slack) = &config.notification.slack {
        channels.push(Box::new(SlackWebhookChannel::new(slack.webhook_url.clone())));
    }

    NotificationOrchestrator::new(formatters, channels)
}

/// Wire the production job: file checkpoint, gh-backed search, configured channels
pub fn build_job(config: &Config) -> PollingJob {
    PollingJob::new(
        config.job_settings(),
        Box::new(FsCheckpointStore::new(config.job.checkpoint_file.clone())),
        Box::new(GhIssueProvider::new(
            config.github.host.clone(),
            config.github.page_size,
        )),
        build_notifier(config),
    )
}

//! The polling job
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! load checkpoint -> compute window -> build query -> fetch
//!     -> notify (only when issues were found) -> persist checkpoint
//! ```
//!
//! A failure at any stage ends the run without writing a checkpoint, so the
//! next run searches the same window again. Failures are logged once and
//! reported as a [`RunOutcome`]; a run never returns an error.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{StorageError, WatchError};
use crate::notify::{ChannelType, Envelope, FormatType, NotificationOrchestrator};
use crate::provider::IssueProvider;
use crate::query;

/// Source of the current time, as a UTC datetime without offset
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock UTC time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Stages of a run, used to report where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadCheckpoint,
    ComputeWindow,
    BuildQuery,
    Fetch,
    Notify,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadCheckpoint => "load_checkpoint",
            Stage::ComputeWindow => "compute_window",
            Stage::BuildQuery => "build_query",
            Stage::Fetch => "fetch",
            Stage::Notify => "notify",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stage succeeded and `checkpoint` was persisted
    Completed {
        issues: usize,
        notified: bool,
        checkpoint: Checkpoint,
    },
    /// The run stopped at `stage`; no checkpoint was written
    Failed { stage: Stage, error: WatchError },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Configuration the job runs on
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub qualifiers: Vec<String>,
    /// Window size for the very first run
    pub initial_lookback_hours: u32,
    pub format: FormatType,
    pub channel: ChannelType,
    pub envelope: Envelope,
}

/// Polls the provider for issues created since the last run and notifies about them
pub struct PollingJob {
    settings: JobSettings,
    store: Box<dyn CheckpointStore>,
    provider: Box<dyn IssueProvider>,
    notifier: NotificationOrchestrator,
    clock: Box<dyn Clock>,
}

type StageError = (Stage, WatchError);

/// Tag an error with the stage it stopped the run at
fn at<E: Into<WatchError>>(stage: Stage) -> impl FnOnce(E) -> StageError {
    move |e| (stage, e.into())
}

impl PollingJob {
    pub fn new(
        settings: JobSettings,
        store: Box<dyn CheckpointStore>,
        provider: Box<dyn IssueProvider>,
        notifier: NotificationOrchestrator,
    ) -> Self {
        Self {
            settings,
            store,
            provider,
            notifier,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. with a fixed time in tests
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Lower bound of the search window
    ///
    /// The previous run's *start* time, so issues created while that run was
    /// in flight are picked up again; without a previous run, `now` minus the
    /// configured lookback.
    pub fn window_start(&self, now: NaiveDateTime, last: Option<&Checkpoint>) -> NaiveDateTime {
        match last {
            Some(checkpoint) => checkpoint.start_time(),
            None => {
                let lookback = TimeDelta::hours(i64::from(self.settings.initial_lookback_hours));
                now.checked_sub_signed(lookback)
                    .unwrap_or(NaiveDateTime::MIN)
            }
        }
    }

    /// The query the next run would send, without fetching or writing anything
    ///
    /// Like a run, this creates an empty checkpoint file if none exists.
    pub fn preview_query(&self) -> Result<String, StorageError> {
        let last = self.store.load()?;
        let window_start = self.window_start(self.clock.now(), last.as_ref());
        Ok(query::build(&self.settings.qualifiers, window_start))
    }

    /// Execute one run
    pub async fn run(&self) -> RunOutcome {
        let start_time = self.clock.now();
        info!(%start_time, "starting issue search run");

        match self.execute(start_time).await {
            Ok((issues, notified, checkpoint)) => {
                info!(
                    issues,
                    notified,
                    job_id = %checkpoint.job_id(),
                    duration_ms = checkpoint.duration_ms(),
                    "issue search run completed"
                );
                RunOutcome::Completed {
                    issues,
                    notified,
                    checkpoint,
                }
            }
            Err((stage, error)) => {
                error!(%stage, error = %error, "issue search run failed");
                if stage == Stage::Persist {
                    warn!("a notification may already have been sent; the next run will search the same window again");
                }
                RunOutcome::Failed { stage, error }
            }
        }
    }

    async fn execute(
        &self,
        start_time: NaiveDateTime,
    ) -> Result<(usize, bool, Checkpoint), StageError> {
        let last = self.store.load().map_err(at(Stage::LoadCheckpoint))?;
        if last.is_none() {
            info!(
                lookback_hours = self.settings.initial_lookback_hours,
                "no previous run recorded, using initial lookback"
            );
        }

        let window_start = self.window_start(start_time, last.as_ref());
        debug!(stage = %Stage::ComputeWindow, %window_start);

        let search_query = query::build(&self.settings.qualifiers, window_start);
        debug!(stage = %Stage::BuildQuery, qualifiers = self.settings.qualifiers.len());
        info!(query = %search_query, "github search query");

        let issues = self
            .provider
            .find(&search_query)
            .await
            .map_err(at(Stage::Fetch))?;
        info!(count = issues.len(), "issues found");

        let notified = !issues.is_empty();
        if notified {
            self.notifier
                .dispatch(
                    self.settings.format,
                    self.settings.channel,
                    &self.settings.envelope,
                    &issues,
                )
                .await
                .map_err(at(Stage::Notify))?;
            info!(channel = %self.settings.channel, "notification sent");
        }

        let checkpoint = Checkpoint::new(start_time, self.clock.now());
        self.store.save(&checkpoint).map_err(at(Stage::Persist))?;

        Ok((issues.len(), notified, checkpoint))
    }

    /// Run repeatedly, `interval` apart, until Ctrl-C
    ///
    /// Runs are strictly sequential; the sleep starts after a run ends.
    pub async fn watch(&self, interval: Duration) -> anyhow::Result<()> {
        info!(interval_secs = interval.as_secs(), "starting continuous watch");

        loop {
            self.run().await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("interrupted, stopping watch");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::types::Issue;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct NoStore;

    impl CheckpointStore for NoStore {
        fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
            Ok(None)
        }

        fn save(&self, _checkpoint: &Checkpoint) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct NoIssues;

    #[async_trait]
    impl IssueProvider for NoIssues {
        async fn find(&self, _query: &str) -> Result<Vec<Issue>, ProviderError> {
            Ok(vec![])
        }
    }

    fn job(lookback_hours: u32) -> PollingJob {
        let settings = JobSettings {
            qualifiers: vec!["is:issue".into()],
            initial_lookback_hours: lookback_hours,
            format: FormatType::Plaintext,
            channel: ChannelType::EmailSmtp,
            envelope: Envelope {
                sender: "a@example.com".into(),
                recipient: "b@example.com".into(),
                subject: "s".into(),
            },
        };
        PollingJob::new(
            settings,
            Box::new(NoStore),
            Box::new(NoIssues),
            NotificationOrchestrator::new(vec![], vec![]),
        )
    }

    fn at_time(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 9)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn first_run_looks_back_configured_hours() {
        assert_eq!(job(24).window_start(at_time(12), None), at_time(12) - TimeDelta::hours(24));
    }

    #[test]
    fn later_runs_start_at_previous_start_time() {
        let previous = Checkpoint::new(at_time(6), at_time(7));
        assert_eq!(job(24).window_start(at_time(12), Some(&previous)), at_time(6));
    }

    #[test]
    fn huge_lookback_saturates() {
        assert_eq!(job(u32::MAX).window_start(at_time(0), None), NaiveDateTime::MIN);
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(Stage::LoadCheckpoint.to_string(), "load_checkpoint");
        assert_eq!(Stage::Persist.to_string(), "persist");
    }

    #[tokio::test]
    async fn empty_search_still_records_checkpoint() {
        let outcome = job(1).run().await;
        match outcome {
            RunOutcome::Completed { issues, notified, .. } => {
                assert_eq!(issues, 0);
                assert!(!notified);
            }
            RunOutcome::Failed { stage, error } => panic!("failed at {stage}: {error}"),
        }
    }
}

//! Checkpoint persistence
//!
//! A checkpoint records when the most recent successful run started and
//! ended. The next run uses its start time as the lower bound of the search
//! window, so a run that fails before persisting leaves the window untouched
//! and the following run searches it again.

mod fs;

pub use fs::FsCheckpointStore;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Metadata of the most recently completed run
///
/// Serialized as `{"jobId", "startTime", "endTime", "duration"}` with
/// timestamps as ISO-8601 UTC datetimes without an offset suffix.
///
/// Deserialization rejects records whose end precedes their start or whose
/// duration disagrees with the timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CheckpointRecord")]
pub struct Checkpoint {
    job_id: Uuid,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    /// Run duration in milliseconds
    duration: i64,
}

impl Checkpoint {
    /// Record a finished run under a freshly generated id
    ///
    /// An `end_time` earlier than `start_time` (wall clock stepped backwards)
    /// is clamped to `start_time` so the duration is never negative.
    pub fn new(start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self::with_id(Uuid::new_v4(), start_time, end_time)
    }

    pub fn with_id(job_id: Uuid, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        let end_time = end_time.max(start_time);
        Self {
            job_id,
            start_time,
            end_time,
            duration: (end_time - start_time).num_milliseconds(),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration
    }
}

/// Checkpoint as read from storage, before its invariants are checked
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointRecord {
    job_id: Uuid,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    duration: i64,
}

impl TryFrom<CheckpointRecord> for Checkpoint {
    type Error = String;

    fn try_from(record: CheckpointRecord) -> Result<Self, Self::Error> {
        if record.end_time < record.start_time {
            return Err(format!(
                "endTime {} is before startTime {}",
                record.end_time, record.start_time
            ));
        }
        let checkpoint = Checkpoint::with_id(record.job_id, record.start_time, record.end_time);
        if checkpoint.duration != record.duration {
            return Err(format!(
                "duration {} does not match timestamps ({} ms)",
                record.duration, checkpoint.duration
            ));
        }
        Ok(checkpoint)
    }
}

/// Durable single-record store for the last [`Checkpoint`]
///
/// Implementations keep at most one record; `save` replaces it wholesale.
pub trait CheckpointStore: Send + Sync {
    /// Return the stored checkpoint, or `None` when no run has completed yet
    fn load(&self) -> Result<Option<Checkpoint>, StorageError>;

    /// Replace the stored checkpoint
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError>;
}

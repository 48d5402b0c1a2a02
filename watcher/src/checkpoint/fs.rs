//! File-backed checkpoint store

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::{Checkpoint, CheckpointStore};
use crate::error::StorageError;

/// Stores the checkpoint as a single JSON document at a fixed path
///
/// Saves go through a sibling `<name>.tmp` file that is synced and then
/// renamed over the target, so a reader sees either the old record or the
/// new one, never a partial write.
#[derive(Debug, Clone)]
pub struct FsCheckpointStore {
    path: PathBuf,
}

impl FsCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Create the (empty) checkpoint file and any missing parent directories
    fn create_empty(&self) -> Result<(), StorageError> {
        let read_err = |source| StorageError::Read {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(read_err)?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(read_err)?;
        Ok(())
    }
}

impl CheckpointStore for FsCheckpointStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
        if !self.path.exists() {
            debug!("no checkpoint file yet, creating an empty one");
            self.create_empty()?;
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!("checkpoint file has no data");
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    #[instrument(skip(self, checkpoint), fields(path = %self.path.display(), job_id = %checkpoint.job_id()))]
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(checkpoint).map_err(StorageError::Serialize)?;
        let tmp_path = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err(parent))?;
        }

        {
            let mut file = File::create(&tmp_path).map_err(write_err(&tmp_path))?;
            file.write_all(&bytes).map_err(write_err(&tmp_path))?;
            file.sync_all().map_err(write_err(&tmp_path))?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(&self.path)(e));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            sync_dir(parent).map_err(write_err(parent))?;
        }

        debug!("checkpoint saved");
        Ok(())
    }
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Write { path, source }
}

/// Make a rename inside `dir` durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

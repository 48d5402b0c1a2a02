//! Error taxonomy for a polling run
//!
//! Each concern has its own error type; [`WatchError`] unifies them so the
//! job can propagate with `?` and report the failure once at the top.

use std::path::PathBuf;

use thiserror::Error;

use crate::gh::GhError;

/// Any failure that ends a run early
#[derive(Error, Debug)]
pub enum WatchError {
    /// No formatter or channel strategy supports the requested type
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// The issue search failed
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("issue search via gh failed: {0}")]
    Gh(#[from] GhError),

    /// GitHub answered with `incomplete_results`; the window must be searched again
    #[error("GitHub returned incomplete search results ({fetched} of {total})")]
    Incomplete { total: u32, fetched: u32 },
}

/// Reading or writing the checkpoint file failed
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to read checkpoint {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("checkpoint {} is not a valid checkpoint: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write checkpoint {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize checkpoint: {0}")]
    Serialize(serde_json::Error),
}

/// A notification channel could not deliver the message
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to run mail transport `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to hand message to mail transport: {0}")]
    Io(#[from] std::io::Error),

    #[error("mail transport rejected message (exit code {code}): {stderr}")]
    Rejected { code: i32, stderr: String },

    /// Header values must be single-line
    #[error("invalid {name} header: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    WebhookStatus { status: u16, body: String },
}

pub type WatchResult<T> = Result<T, WatchError>;

//! Issue providers
//!
//! The job only needs one capability from a provider: run a search query
//! and return the matching issues in the provider's order.

mod github;

pub use github::GhIssueProvider;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::Issue;

/// Searches an issue tracker
#[async_trait]
pub trait IssueProvider: Send + Sync {
    /// Return every issue matching `query`, in the order the provider ranks them
    async fn find(&self, query: &str) -> Result<Vec<Issue>, ProviderError>;
}

//! Issue and repository values passed between the provider and the notifier
//!
//! These are ephemeral: they live for a single run and are never persisted.

/// A newly created issue returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Issue title
    pub title: String,

    /// Issue body (markdown), empty when the issue has none
    pub body: String,

    /// Issue URL on the web UI
    pub url: String,

    /// Repository the issue lives in
    pub repository: Repository,
}

/// Repository context for an [`Issue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// User or organization that owns the repository
    pub owner_name: String,

    /// Repository name without owner
    pub repository_name: String,

    /// Full repository name with owner (e.g., "owner/repo")
    pub full_repository_name: String,

    /// Repository URL on the web UI
    pub url: String,
}

impl Repository {
    pub fn new(owner: &str, name: &str, url: impl Into<String>) -> Self {
        Self {
            owner_name: owner.to_string(),
            repository_name: name.to_string(),
            full_repository_name: format!("{owner}/{name}"),
            url: url.into(),
        }
    }
}

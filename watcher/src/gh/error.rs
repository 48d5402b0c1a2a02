//! Error types for gh CLI operations

use thiserror::Error;

/// Errors that can occur when executing gh CLI commands
#[derive(Error, Debug)]
pub enum GhError {
    /// The gh command failed with a non-zero exit code
    #[error("gh command failed (exit code {code}): {stderr}")]
    CommandFailed {
        /// Exit code from the gh process
        code: i32,
        /// Standard error output from gh
        stderr: String,
    },

    /// Failed to spawn the gh process
    #[error("failed to spawn gh process: {0}")]
    SpawnError(#[from] std::io::Error),

    /// Failed to parse JSON output from gh
    #[error("failed to parse gh JSON output: {0}")]
    ParseError(#[from] serde_json::Error),

    /// gh CLI is not installed or not in PATH
    #[error("gh CLI not found - ensure gh is installed and in PATH")]
    NotFound,

    /// gh CLI is not authenticated
    #[error("gh CLI not authenticated - run 'gh auth login' first")]
    NotAuthenticated,
}

/// Result type alias for gh operations
pub type GhResult<T> = Result<T, GhError>;

impl GhError {
    /// Classify a failed gh invocation from its exit code and stderr
    pub(crate) fn from_failure(code: i32, stderr: String) -> Self {
        if is_auth_failure(&stderr) {
            GhError::NotAuthenticated
        } else {
            GhError::CommandFailed { code, stderr }
        }
    }
}

fn is_auth_failure(stderr: &str) -> bool {
    stderr.contains("gh auth login") || stderr.contains("not logged in")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_hint_in_stderr_is_not_authenticated() {
        let err = GhError::from_failure(4, "To get started with GitHub CLI, please run:  gh auth login".into());
        assert!(matches!(err, GhError::NotAuthenticated));
    }

    #[test]
    fn other_failures_keep_exit_code() {
        let err = GhError::from_failure(1, "HTTP 422: Validation Failed".into());
        match err {
            GhError::CommandFailed { code, stderr } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("422"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

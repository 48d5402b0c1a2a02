//! Async executor for gh CLI commands
//!
//! # Example
//!
//! ```rust,ignore
//! use issue_watch::gh::execute_gh_api;
//!
//! let page: serde_json::Value = execute_gh_api(
//!     None,
//!     "search/issues",
//!     &[("q", "is:issue label:bug".to_string())],
//! ).await?;
//! ```

use serde::de::DeserializeOwned;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, error, instrument};

use super::error::{GhError, GhResult};

/// Call a GitHub REST endpoint through `gh api` and parse the JSON response
///
/// Every field is sent as a query-string parameter of a `GET` request
/// (`-f key=value`), so values containing spaces or quotes reach GitHub
/// verbatim without shell or search-syntax quoting.
///
/// # Arguments
///
/// * `hostname` - GitHub Enterprise host, or `None` for the gh default
/// * `endpoint` - REST path relative to the API root (e.g. `search/issues`)
/// * `params` - Query parameters for the request
///
/// # Errors
///
/// Returns an error if:
/// - The gh process fails to spawn
/// - The command exits with non-zero status
/// - The JSON output cannot be parsed
#[instrument(skip(params))]
pub async fn execute_gh_api<T: DeserializeOwned>(
    hostname: Option<&str>,
    endpoint: &str,
    params: &[(&str, String)],
) -> GhResult<T> {
    let mut args: Vec<String> = vec!["api".into(), "-X".into(), "GET".into()];
    if let Some(host) = hostname {
        args.push("--hostname".into());
        args.push(host.to_string());
    }
    args.push(endpoint.to_string());
    for (key, value) in params {
        args.push("-f".into());
        args.push(format!("{key}={value}"));
    }

    debug!("executing: gh {}", args.join(" "));

    let output = Command::new("gh")
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?
        .wait_with_output()
        .await?;

    if let Err(e) = exit_status(&output) {
        error!(error = %e, "gh api call failed");
        return Err(e);
    }

    let parsed: T = serde_json::from_slice(&output.stdout)?;
    Ok(parsed)
}

/// Check if gh CLI is available and authenticated
#[instrument]
pub async fn check_gh_available(hostname: Option<&str>) -> GhResult<()> {
    debug!("checking gh availability");

    let mut args = vec!["auth", "status"];
    if let Some(host) = hostname {
        args.extend(["--hostname", host]);
    }

    let output = Command::new("gh")
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?
        .wait_with_output()
        .await?;

    exit_status(&output)?;

    debug!("gh is available and authenticated");
    Ok(())
}

/// Any non-zero exit is a failure, classified from stderr
fn exit_status(output: &Output) -> GhResult<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let code = output.status.code().unwrap_or(-1);
    Err(GhError::from_failure(code, stderr))
}

fn spawn_error(e: std::io::Error) -> GhError {
    if e.kind() == std::io::ErrorKind::NotFound {
        GhError::NotFound
    } else {
        GhError::SpawnError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn output(code: i32, stderr: &str) -> Output {
        use std::os::unix::process::ExitStatusExt;
        Output {
            status: std::process::ExitStatus::from_raw(code << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_ok() {
        assert!(exit_status(&output(0, "")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn unknown_host_is_a_failure() {
        let err = exit_status(&output(1, "error connecting to ghe.example.com\n")).unwrap_err();
        match err {
            GhError::CommandFailed { code, stderr } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("ghe.example.com"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn logged_out_is_not_authenticated() {
        let err = exit_status(&output(
            1,
            "You are not logged in to any GitHub hosts. Run gh auth login to authenticate.",
        ))
        .unwrap_err();
        assert!(matches!(err, GhError::NotAuthenticated));
    }

    #[tokio::test]
    #[ignore = "requires gh CLI and network"]
    async fn test_check_gh_available() {
        let result = check_gh_available(None).await;
        println!("gh available: {:?}", result.is_ok());
    }
}

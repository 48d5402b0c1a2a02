//! gh CLI wrapper module
//!
//! Runs `gh` as a child process and decodes its JSON output. This is the
//! only place the crate talks to GitHub.

pub mod error;
pub mod executor;

pub use error::{GhError, GhResult};
pub use executor::{check_gh_available, execute_gh_api};

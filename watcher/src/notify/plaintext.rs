//! Plain-text digest

use std::fmt::Write;

use super::{FormatType, IssueFormatter};
use crate::types::Issue;

/// One two-line block per issue, each followed by a blank line:
///
/// ```text
/// New issue in acme/widgets: Crash on startup
/// View here: https://github.com/acme/widgets/issues/1
///
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextFormatter;

impl IssueFormatter for PlainTextFormatter {
    fn supports(&self, format: FormatType) -> bool {
        format == FormatType::Plaintext
    }

    fn format(&self, issues: &[Issue]) -> String {
        let mut out = String::new();
        for issue in issues {
            // Writing into a String cannot fail
            let _ = write!(
                out,
                "New issue in {}: {}\nView here: {}\n\n",
                issue.repository.full_repository_name, issue.title, issue.url
            );
        }
        out
    }
}

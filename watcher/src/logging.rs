//! Tracing setup for the `issue-watch` binary
//!
//! Everything is written to stderr; stdout is reserved for `status` and
//! `query` output so it can be piped.

use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset, empty, or unparseable
pub const DEFAULT_FILTER: &str = "issue_watch=info";

/// Output encoding for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON, anything else is text
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Build the filter from a `RUST_LOG` value.
///
/// Returns the filter and, when the value was rejected, the parse error so the
/// caller can report it once a subscriber exists.
pub fn env_filter(rust_log: Option<&str>) -> (EnvFilter, Option<String>) {
    match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        None => (EnvFilter::new(DEFAULT_FILTER), None),
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(format!("{directives}: {e}"))),
        },
    }
}

/// Install the global subscriber. Reads `RUST_LOG` and `LOG_FORMAT`.
pub fn init_tracing() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, rejected) = env_filter(rust_log.as_deref());
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
            .try_init()?,
    }

    if let Some(reason) = rejected {
        warn!(%reason, fallback = DEFAULT_FILTER, "ignoring invalid RUST_LOG");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_uses_default() {
        let (filter, rejected) = env_filter(None);
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
        assert!(rejected.is_none());
    }

    #[test]
    fn blank_uses_default() {
        let (filter, _) = env_filter(Some("  "));
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
    }

    #[test]
    fn rust_log_can_raise_crate_level() {
        let (filter, rejected) = env_filter(Some("issue_watch=debug"));
        let rendered = filter.to_string();
        assert!(rendered.contains("issue_watch=debug"), "{rendered}");
        assert!(!rendered.contains("issue_watch=info"), "{rendered}");
        assert!(rejected.is_none());
    }

    #[test]
    fn invalid_rust_log_falls_back() {
        let (filter, rejected) = env_filter(Some("issue_watch=loud"));
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
        assert!(rejected.unwrap().contains("issue_watch=loud"));
    }

    #[test]
    fn log_format_selection() {
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::parse(None), LogFormat::Text);
    }
}

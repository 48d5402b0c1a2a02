//! Configuration loading
//!
//! The whole configuration is read once at start-up into an immutable
//! [`Config`] and handed to the components that need it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::job::JobSettings;
use crate::notify::{ChannelType, Envelope, FormatType};

/// File name searched for when no explicit config path is given
pub const CONFIG_FILE_NAME: &str = ".issue-watch.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/issue-watch/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("issue-watch").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Top-level configuration (from .issue-watch.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// GitHub search section
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// GitHub Enterprise host; `gh`'s default host when unset
    pub host: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Search qualifiers in GitHub syntax (e.g. `label:bug`)
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

/// Job bookkeeping section
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Relative paths are resolved against the config file's directory
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
    /// How far back the very first run searches
    #[serde(default = "default_initial_lookback_hours")]
    pub initial_lookback_hours: u32,
}

/// Notification section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub format: FormatType,
    #[serde(default)]
    pub channel: ChannelType,
    #[serde(default)]
    pub email: EmailConfig,
    pub slack: Option<SlackConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_sendmail_command")]
    pub sendmail_command: String,
    #[serde(default = "default_sendmail_args")]
    pub sendmail_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

// Default value functions
fn default_page_size() -> u32 {
    50
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from("data/job-execution.json")
}

fn default_initial_lookback_hours() -> u32 {
    24
}

fn default_subject() -> String {
    "New GitHub issues".to_string()
}

fn default_sendmail_command() -> String {
    "sendmail".to_string()
}

fn default_sendmail_args() -> Vec<String> {
    vec!["-t".to_string(), "-i".to_string()]
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            host: None,
            page_size: default_page_size(),
            qualifiers: Vec::new(),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            checkpoint_file: default_checkpoint_file(),
            initial_lookback_hours: default_initial_lookback_hours(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            recipient: String::new(),
            subject: default_subject(),
            sendmail_command: default_sendmail_command(),
            sendmail_args: default_sendmail_args(),
        }
    }
}

impl Config {
    /// Load config from `explicit`, or search for .issue-watch.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .issue-watch.toml
    /// 2. Check ~/.config/issue-watch/.issue-watch.toml (global fallback)
    ///
    /// Unlike the search qualifiers, the recipient has no sensible default,
    /// so a missing file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => find_config_file(CONFIG_FILE_NAME).with_context(|| {
                format!("no {CONFIG_FILE_NAME} found in the current directory, its parents, or the global config directory")
            })?,
        };
        tracing::debug!("Loading config from: {}", path.display());

        let mut config = Self::load_from_path(&path)?;
        config.apply_env_overrides(std::env::var("SLACK_WEBHOOK_URL").ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific path; relative paths inside are anchored at its directory
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if config.job.checkpoint_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.job.checkpoint_file = dir.join(&config.job.checkpoint_file);
            }
        }
        Ok(config)
    }

    fn apply_env_overrides(&mut self, slack_webhook: Option<String>) {
        if let Some(webhook_url) = slack_webhook.filter(|u| !u.trim().is_empty()) {
            self.notification.slack = Some(SlackConfig { webhook_url });
        }
    }

    /// Reject configurations that could never complete a run
    pub fn validate(&self) -> Result<()> {
        if self.job.checkpoint_file.as_os_str().is_empty() {
            bail!("job.checkpoint_file must not be empty");
        }
        if self.notification.channel == ChannelType::EmailSmtp {
            let email = &self.notification.email;
            if email.sender.trim().is_empty() {
                bail!("notification.email.sender is required for the email_smtp channel");
            }
            if email.recipient.trim().is_empty() {
                bail!("notification.email.recipient is required for the email_smtp channel");
            }
        }
        if self.github.qualifiers.is_empty() {
            tracing::warn!("github.qualifiers is empty; every new issue on GitHub will match");
        }
        Ok(())
    }

    /// The slice of configuration the polling job runs on
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            qualifiers: self.github.qualifiers.clone(),
            initial_lookback_hours: self.job.initial_lookback_hours,
            format: self.notification.format,
            channel: self.notification.channel,
            envelope: Envelope {
                sender: self.notification.email.sender.clone(),
                recipient: self.notification.email.recipient.clone(),
                subject: self.notification.email.subject.clone(),
            },
        }
    }
}

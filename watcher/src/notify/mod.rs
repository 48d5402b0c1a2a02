//! Notification formatting and delivery
//!
//! Formatters and channels are strategies selected by a type tag at dispatch
//! time. The [`NotificationOrchestrator`] holds both sets in registration
//! order and uses the first strategy that supports the requested tag.

mod email;
mod plaintext;
mod slack;

pub use email::{EmailChannel, MailMessage, MailTransport, SendmailTransport};
pub use plaintext::PlainTextFormatter;
pub use slack::SlackWebhookChannel;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{DeliveryError, WatchError, WatchResult};
use crate::types::Issue;

/// How the issue digest is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    #[default]
    Plaintext,
}

/// Where the digest is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    #[default]
    EmailSmtp,
    SlackWebhook,
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatType::Plaintext => f.write_str("plaintext"),
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::EmailSmtp => f.write_str("email_smtp"),
            ChannelType::SlackWebhook => f.write_str("slack_webhook"),
        }
    }
}

/// Sender, recipient and subject of a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
}

/// Renders a list of issues into a message body
pub trait IssueFormatter: Send + Sync {
    fn supports(&self, format: FormatType) -> bool;

    /// Render `issues` in the order given
    fn format(&self, issues: &[Issue]) -> String;
}

/// Delivers a rendered message
///
/// `dispatch` resolves only once the message was accepted or rejected.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn supports(&self, channel: ChannelType) -> bool;

    async fn dispatch(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), DeliveryError>;
}

/// Picks a formatter and a channel per dispatch and sends the digest
pub struct NotificationOrchestrator {
    formatters: Vec<Box<dyn IssueFormatter>>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationOrchestrator {
    /// Strategies are consulted in the order given here
    pub fn new(
        formatters: Vec<Box<dyn IssueFormatter>>,
        channels: Vec<Box<dyn NotificationChannel>>,
    ) -> Self {
        Self {
            formatters,
            channels,
        }
    }

    /// Format `issues` and deliver them through the requested channel
    ///
    /// # Errors
    ///
    /// [`WatchError::Configuration`] when no registered strategy supports
    /// `format` or `channel`; [`WatchError::Delivery`] when the channel fails.
    #[instrument(skip(self, envelope, issues), fields(issues = issues.len()))]
    pub async fn dispatch(
        &self,
        format: FormatType,
        channel: ChannelType,
        envelope: &Envelope,
        issues: &[Issue],
    ) -> WatchResult<()> {
        let formatter = self
            .formatters
            .iter()
            .find(|f| f.supports(format))
            .ok_or_else(|| {
                WatchError::Configuration(format!("no issue formatter supports format `{format}`"))
            })?;
        let message = formatter.format(issues);

        let notifier = self
            .channels
            .iter()
            .find(|c| c.supports(channel))
            .ok_or_else(|| {
                WatchError::Configuration(format!(
                    "no notification channel supports channel `{channel}`"
                ))
            })?;

        debug!("dispatching notification");
        notifier
            .dispatch(
                &envelope.sender,
                &envelope.recipient,
                &envelope.subject,
                &message,
            )
            .await?;
        Ok(())
    }
}

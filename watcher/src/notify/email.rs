//! Email delivery
//!
//! [`EmailChannel`] turns a dispatch into a [`MailMessage`] and hands it to a
//! [`MailTransport`]. The shipped transport pipes the message into a
//! sendmail-compatible binary (sendmail, msmtp, ssmtp, ...), which relays
//! it over SMTP with whatever credentials the host is configured with.

use std::process::Stdio;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use super::{ChannelType, NotificationChannel};
use crate::error::DeliveryError;

/// A plain-text email ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Build a message, rejecting header values that span lines
    pub fn new(from: &str, to: &str, subject: &str, body: &str) -> Result<Self, DeliveryError> {
        Ok(Self {
            from: single_line("From", from)?,
            to: single_line("To", to)?,
            subject: single_line("Subject", subject)?,
            body: body.to_string(),
        })
    }

    /// Render as an RFC 5322 message
    pub fn render(&self, date: DateTime<Utc>) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\nDate: {}\nMIME-Version: 1.0\nContent-Type: text/plain; charset=utf-8\nContent-Transfer-Encoding: 8bit\n\n{}",
            self.from,
            self.to,
            encode_header(&self.subject),
            date.to_rfc2822(),
            self.body
        )
    }
}

fn single_line(name: &'static str, value: &str) -> Result<String, DeliveryError> {
    if value.contains(['\r', '\n']) {
        return Err(DeliveryError::InvalidHeader {
            name,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

/// RFC 2047 encoded-word for non-ASCII header text
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
        format!("=?UTF-8?B?{encoded}?=")
    }
}

/// Sends a [`MailMessage`]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError>;
}

/// Pipes messages into `sendmail -t -i` (or a configured equivalent)
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    command: String,
    args: Vec<String>,
}

impl SendmailTransport {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self::new("sendmail", vec!["-t".into(), "-i".into()])
    }
}

#[async_trait]
impl MailTransport for SendmailTransport {
    #[instrument(skip(self, message), fields(command = %self.command, to = %message.to))]
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DeliveryError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // A mailer that exits early breaks the pipe; its exit status explains why.
        let written = match child.stdin.take() {
            Some(mut stdin) => {
                let rendered = message.render(Utc::now());
                match stdin.write_all(rendered.as_bytes()).await {
                    Ok(()) => stdin.shutdown().await,
                    Err(e) => Err(e),
                }
            }
            None => Ok(()),
        };

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            error!(code, stderr = %stderr, "mail transport rejected message");
            return Err(DeliveryError::Rejected { code, stderr });
        }
        written?;

        debug!("message accepted by mail transport");
        Ok(())
    }
}

/// The `email_smtp` channel
pub struct EmailChannel {
    transport: Box<dyn MailTransport>,
}

impl EmailChannel {
    pub fn new(transport: Box<dyn MailTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn supports(&self, channel: ChannelType) -> bool {
        channel == ChannelType::EmailSmtp
    }

    async fn dispatch(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let mail = MailMessage::new(sender, recipient, subject, message)?;
        self.transport.send(&mail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct CapturingTransport {
        sent: Arc<Mutex<Vec<MailMessage>>>,
    }

    #[async_trait]
    impl MailTransport for CapturingTransport {
        async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn renders_headers_then_body() {
        let mail = MailMessage::new("bot@example.com", "dev@example.com", "New issues", "line one\n").unwrap();
        let date = Utc.with_ymd_and_hms(2025, 11, 9, 12, 0, 0).unwrap();
        let rendered = mail.render(date);

        assert!(rendered.starts_with("From: bot@example.com\nTo: dev@example.com\nSubject: New issues\n"));
        assert!(rendered.contains("Date: Sun, "));
        assert!(rendered.contains("Nov 2025 12:00:00 +0000\n"));
        assert!(rendered.contains("Content-Type: text/plain; charset=utf-8\n"));
        assert!(rendered.ends_with("\n\nline one\n"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        assert_eq!(encode_header("Neue Issues für dich"), "=?UTF-8?B?TmV1ZSBJc3N1ZXMgZsO8ciBkaWNo?=");
        assert_eq!(encode_header("plain"), "plain");
    }

    #[test]
    fn multi_line_header_is_rejected() {
        let err = MailMessage::new("bot@example.com", "dev@example.com\nBcc: x@evil.test", "s", "b").unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidHeader { name: "To", .. }));
    }

    #[tokio::test]
    async fn channel_hands_message_to_transport() {
        let transport = CapturingTransport::default();
        let channel = EmailChannel::new(Box::new(transport.clone()));

        assert!(channel.supports(ChannelType::EmailSmtp));
        assert!(!channel.supports(ChannelType::SlackWebhook));

        channel
            .dispatch("bot@example.com", "dev@example.com", "New issues", "body")
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "dev@example.com");
        assert_eq!(sent[0].body, "body");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sendmail_transport_pipes_message_to_command() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("mail.txt");
        let transport = SendmailTransport::new(
            "sh",
            vec!["-c".into(), format!("cat > {}", out.display())],
        );
        let mail = MailMessage::new("bot@example.com", "dev@example.com", "New issues", "hello\n").unwrap();

        transport.send(&mail).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("From: bot@example.com\n"));
        assert!(written.ends_with("\n\nhello\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_rejected() {
        let transport = SendmailTransport::new(
            "sh",
            vec!["-c".into(), "cat > /dev/null; echo 'relay denied' >&2; exit 75".into()],
        );
        let mail = MailMessage::new("a@example.com", "b@example.com", "s", "b").unwrap();

        match transport.send(&mail).await.unwrap_err() {
            DeliveryError::Rejected { code, stderr } => {
                assert_eq!(code, 75);
                assert_eq!(stderr, "relay denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_reports_status_not_broken_pipe() {
        let transport = SendmailTransport::new(
            "sh",
            vec!["-c".into(), "echo 'unknown user' >&2; exit 67".into()],
        );
        let body = "x".repeat(512 * 1024);
        let mail = MailMessage::new("a@example.com", "b@example.com", "s", &body).unwrap();

        match transport.send(&mail).await.unwrap_err() {
            DeliveryError::Rejected { code, stderr } => {
                assert_eq!(code, 67);
                assert_eq!(stderr, "unknown user");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let transport = SendmailTransport::new("definitely-not-a-mailer-binary", vec![]);
        let mail = MailMessage::new("a@example.com", "b@example.com", "s", "b").unwrap();
        assert!(matches!(transport.send(&mail).await, Err(DeliveryError::Spawn { .. })));
    }
}

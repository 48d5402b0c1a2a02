//! Slack incoming-webhook delivery

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{ChannelType, NotificationChannel};
use crate::error::DeliveryError;

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

/// The `slack_webhook` channel
///
/// The subject becomes a bold heading above the message; the sender is used
/// as the bot username. The recipient is implied by the webhook URL.
#[derive(Debug, Clone)]
pub struct SlackWebhookChannel {
    webhook_url: String,
    http_client: reqwest::Client,
}

impl SlackWebhookChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn payload(sender: &str, subject: &str, message: &str) -> SlackPayload {
        SlackPayload {
            text: format!("*{subject}*\n\n{message}"),
            username: (!sender.is_empty()).then(|| sender.to_string()),
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackWebhookChannel {
    fn supports(&self, channel: ChannelType) -> bool {
        channel == ChannelType::SlackWebhook
    }

    #[instrument(skip_all)]
    async fn dispatch(
        &self,
        sender: &str,
        _recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let response = self
            .http_client
            .post(&self.webhook_url)
            .json(&Self::payload(sender, subject, message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DeliveryError::WebhookStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!("slack webhook accepted message");
        Ok(())
    }
}

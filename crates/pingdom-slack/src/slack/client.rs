//! Slack incoming-webhook delivery.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::SlackMessage;
use crate::error::DeliveryError;

/// Result of posting a message to Slack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub status: u16,
    /// Slack's response body, kept only when delivery failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Posts rendered messages to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackClient {
    webhook_url: String,
    client: Client,
}

impl SlackClient {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    /// Post a message. Only a 200 answer counts as delivered.
    pub async fn post(&self, message: &SlackMessage) -> Result<DeliveryOutcome, DeliveryError> {
        debug!(channel = %message.channel, blocks = message.blocks.len(), "Posting to Slack");

        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            debug!(channel = %message.channel, "Slack message delivered");
            return Ok(DeliveryOutcome {
                success: true,
                status: status.as_u16(),
                body: None,
            });
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            channel = %message.channel,
            status = %status,
            body = %body,
            "Slack webhook request failed"
        );

        Ok(DeliveryOutcome {
            success: false,
            status: status.as_u16(),
            body: Some(body),
        })
    }
}

use super::NotificationSink;
use crate::error::{ArbError, Result};
use async_trait::async_trait;
use log::{error, info};
use serde_json::{json, Value};
use std::time::Duration;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack incoming-webhook sink. Without a webhook URL, messages are only logged.
pub struct SlackNotifier {
    webhook_url: Option<String>,
    http: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| ArbError::NotificationError(format!("Failed to build webhook client: {}", e)))?;
        let webhook_url = webhook_url.filter(|url| !url.trim().is_empty());
        if webhook_url.is_none() {
            info!("Slack webhook not configured; opportunities will only be logged");
        }
        Ok(Self { webhook_url, http })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub fn payload(message: &str) -> Value {
        json!({ "text": message, "mrkdwn": true })
    }

    async fn post(&self, url: &str, message: &str) -> Result<()> {
        let response = self.http.post(url).json(&Self::payload(message)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArbError::NotificationError(format!(
                "webhook answered {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for SlackNotifier {
    async fn send(&self, message: &str) {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => {
                info!("Notification (webhook disabled):\n{}", message);
                return;
            }
        };
        match self.post(url, message).await {
            Ok(()) => info!("Slack notification sent"),
            Err(e) => error!("Slack notification failed: {}", e),
        }
    }
}

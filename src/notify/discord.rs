use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{JobNotification, Notifier};
use crate::error::NotifyError;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    /// One POST, no retry. The caller decides what a failure means.
    async fn send(&self, notification: &JobNotification) -> Result<(), NotifyError> {
        let payload = DiscordWebhookPayload::from(notification);

        self.client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(
            job_id = %notification.job_id,
            success = notification.success,
            "discord_webhook_sent"
        );
        Ok(())
    }
}

/// Discord rejects empty field values and anything over 1024 chars.
const FIELD_VALUE_MAX: usize = 1024;

fn field_value(v: &str) -> String {
    if v.trim().is_empty() {
        return "—".to_string();
    }
    if v.chars().count() <= FIELD_VALUE_MAX {
        return v.to_string();
    }
    let mut out: String = v.chars().take(FIELD_VALUE_MAX - 1).collect();
    out.push('…');
    out
}

#[derive(Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    color: u32,
    fields: Vec<DiscordField>,
    timestamp: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    embeds: Vec<DiscordEmbed>,
}

impl From<&JobNotification> for DiscordWebhookPayload {
    fn from(n: &JobNotification) -> Self {
        Self {
            embeds: vec![DiscordEmbed {
                title: n.title.clone(),
                color: n.color,
                fields: n
                    .fields
                    .iter()
                    .map(|f| DiscordField {
                        name: f.name.clone(),
                        value: field_value(&f.value),
                        inline: f.inline,
                    })
                    .collect(),
                timestamp: n.timestamp_iso(),
            }],
        }
    }
}

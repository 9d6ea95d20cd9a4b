// src/notify/mod.rs
pub mod discord;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::NotifyError;
use crate::model::{ExtractionResult, Job};

pub use self::discord::DiscordNotifier;

pub const COLOR_SUCCESS: u32 = 0x00FF00;
pub const COLOR_FAILURE: u32 = 0xFF0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl NotificationField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

/// Sink-agnostic description of one job's terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotification {
    pub job_id: String,
    pub success: bool,
    pub title: String,
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub timestamp: DateTime<Utc>,
}

impl JobNotification {
    pub fn success(job: &Job, extracted: &ExtractionResult) -> Self {
        Self {
            job_id: job.id.clone(),
            success: true,
            title: "✅ Article Scraped Successfully".to_string(),
            color: COLOR_SUCCESS,
            fields: vec![
                NotificationField::new("Article ID", job.id.as_str(), true),
                NotificationField::new("Source", job.source.as_str(), true),
                NotificationField::new("Category", job.category.as_str(), true),
                NotificationField::new("Title", extracted.title.as_str(), false),
                NotificationField::new("URL", job.url.as_str(), false),
                NotificationField::new("HTTP Status", extracted.http_status.to_string(), true),
            ],
            timestamp: Utc::now(),
        }
    }

    pub fn failure(job: &Job, attempts: u32, error: Option<&str>) -> Self {
        Self {
            job_id: job.id.clone(),
            success: false,
            title: "❌ Article Scraping Failed".to_string(),
            color: COLOR_FAILURE,
            fields: vec![
                NotificationField::new("Article ID", job.id.as_str(), true),
                NotificationField::new("Source", job.source.as_str(), true),
                NotificationField::new("Attempts", attempts.to_string(), true),
                NotificationField::new("URL", job.url.as_str(), false),
                NotificationField::new("Error", error.unwrap_or("Unknown error"), false),
            ],
            timestamp: Utc::now(),
        }
    }

    /// ISO-8601 UTC, e.g. `2025-09-06T09:00:00.000Z`.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &JobNotification) -> Result<(), NotifyError>;
}

/// Used when no webhook is configured: logs and drops.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, notification: &JobNotification) -> Result<(), NotifyError> {
        tracing::debug!(
            job_id = %notification.job_id,
            success = notification.success,
            "notifications disabled (no DISCORD_WEBHOOK_URL)"
        );
        Ok(())
    }
}

// src/model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobDecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// One fetch-and-extract request as published on the work channel.
/// Immutable once published; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub priority: Priority,
}

impl Job {
    /// Deserialize and validate a raw channel payload.
    /// Extra fields are ignored; missing or mistyped ones are not.
    pub fn decode(raw: &str) -> Result<Self, JobDecodeError> {
        let job: Job = serde_json::from_str(raw)?;
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<(), JobDecodeError> {
        if self.id.trim().is_empty() {
            return Err(JobDecodeError::Invalid("empty job id".into()));
        }
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| JobDecodeError::Invalid(format!("url {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(JobDecodeError::Invalid(format!(
                "url {:?} is not an absolute http(s) URL",
                self.url
            )));
        }
        Ok(())
    }
}

/// Metadata pulled out of one successfully fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub http_status: u16,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Success,
    Failed,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Success => "success",
            ArticleStatus::Failed => "failed",
        }
    }
}

/// Durable projection of a job plus its latest extraction. Keyed by `id`;
/// every write replaces the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub priority: Priority,
    pub status: ArticleStatus,
    pub attempts: u32,
    pub error_message: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub http_status: Option<u16>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ArticleRecord {
    fn from_job(job: &Job, status: ArticleStatus, attempts: u32) -> Self {
        Self {
            id: job.id.clone(),
            url: job.url.clone(),
            source: job.source.clone(),
            category: job.category.clone(),
            priority: job.priority,
            status,
            attempts,
            error_message: None,
            title: None,
            description: None,
            author: None,
            published_date: None,
            http_status: None,
            fetched_at: None,
        }
    }

    pub fn success(job: &Job, attempts: u32, extracted: &ExtractionResult) -> Self {
        Self {
            title: Some(extracted.title.clone()),
            description: extracted.description.clone(),
            author: extracted.author.clone(),
            published_date: extracted.published_date.clone(),
            http_status: Some(extracted.http_status),
            fetched_at: Some(extracted.fetched_at),
            ..Self::from_job(job, ArticleStatus::Success, attempts)
        }
    }

    pub fn failed(job: &Job, attempts: u32, error_message: impl Into<String>) -> Self {
        Self {
            error_message: Some(error_message.into()),
            ..Self::from_job(job, ArticleStatus::Failed, attempts)
        }
    }
}

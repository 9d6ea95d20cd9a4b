// src/retry.rs
//! Retry/backoff executor.
//!
//! Per job: `Attempting(1) -> .. -> Attempting(max)`, ending in `Success` or
//! `Exhausted`. An attempt is fetch + extract; any failure in either counts the
//! same. Between failed attempts the worker sleeps `base * 2^(n-1)`; there is
//! no sleep after the last one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;

use crate::dead_letter::DeadLetterRouter;
use crate::error::{AttemptError, ProcessError, StoreError};
use crate::extract::extract_metadata_with_charset;
use crate::fetch::PageSource;
use crate::model::{ArticleRecord, ExtractionResult, Job};
use crate::notify::{JobNotification, Notifier};
use crate::store::ArticleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    /// `max_retries` below 1 is treated as 1.
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff_base,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Sleep inserted after failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Every sleep a fully failing job goes through, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_retries).map(|n| self.delay_after(n))
    }
}

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success { attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl JobOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            JobOutcome::Success { attempts } | JobOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }
}

pub struct JobProcessor {
    source: Arc<dyn PageSource>,
    store: Arc<dyn ArticleStore>,
    notifier: Arc<dyn Notifier>,
    dead_letter: DeadLetterRouter,
    policy: RetryPolicy,
}

impl JobProcessor {
    pub fn new(
        source: Arc<dyn PageSource>,
        store: Arc<dyn ArticleStore>,
        notifier: Arc<dyn Notifier>,
        dead_letter: DeadLetterRouter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            dead_letter,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Drive `job` to a terminal state. `raw` is the payload exactly as it
    /// was dequeued; it is what lands on the failure channel.
    ///
    /// A job that runs out of attempts is `Ok(Exhausted)`, not an error. Only
    /// a store backend failure or a failed dead-letter push is `Err`.
    pub async fn process(&self, job: &Job, raw: &str) -> Result<JobOutcome, ProcessError> {
        tracing::info!(job_id = %job.id, url = %job.url, "task_processing_started");

        let max = self.policy.max_retries;
        let mut attempt: u32 = 1;
        loop {
            counter!("job_attempts_total").increment(1);

            let err = match self.attempt(job).await {
                Ok(extracted) => {
                    self.persist(&ArticleRecord::success(job, attempt, &extracted))
                        .await?;
                    self.notify(&JobNotification::success(job, &extracted)).await;
                    counter!("jobs_succeeded_total").increment(1);
                    tracing::info!(job_id = %job.id, attempts = attempt, "task_processing_complete");
                    return Ok(JobOutcome::Success { attempts: attempt });
                }
                Err(err) => err,
            };

            let last_error = err.to_string();
            tracing::warn!(
                job_id = %job.id,
                attempt,
                max_retries = max,
                error = %last_error,
                "task_processing_failed"
            );

            if attempt >= max {
                return self.exhaust(job, raw, attempt, last_error).await;
            }

            let delay = self.policy.delay_after(attempt);
            tracing::info!(
                job_id = %job.id,
                next_attempt = attempt + 1,
                backoff_ms = delay.as_millis() as u64,
                "retry_scheduled"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, job: &Job) -> Result<ExtractionResult, AttemptError> {
        let page = self.source.fetch(&job.url, &job.id).await?;
        let meta = extract_metadata_with_charset(&page.body, page.charset.as_deref(), &job.id)?;
        Ok(ExtractionResult {
            title: meta.title,
            description: meta.description,
            author: meta.author,
            published_date: meta.published_date,
            http_status: page.status,
            fetched_at: Utc::now(),
        })
    }

    async fn exhaust(
        &self,
        job: &Job,
        raw: &str,
        attempts: u32,
        last_error: String,
    ) -> Result<JobOutcome, ProcessError> {
        tracing::error!(job_id = %job.id, attempts, error = %last_error, "task_failed_all_retries");

        self.persist(&ArticleRecord::failed(job, attempts, last_error.as_str()))
            .await?;
        self.notify(&JobNotification::failure(job, attempts, Some(last_error.as_str())))
            .await;
        self.dead_letter.route(&job.id, raw).await?;

        counter!("jobs_failed_total").increment(1);
        Ok(JobOutcome::Exhausted {
            attempts,
            last_error,
        })
    }

    /// Conflicts are logged and treated as written.
    async fn persist(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        match self.store.upsert(record).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %record.id,
                    status = record.status.as_str(),
                    attempts = record.attempts,
                    "article_stored"
                );
                Ok(())
            }
            Err(StoreError::Conflict { id, url }) => {
                counter!("store_conflicts_total").increment(1);
                tracing::warn!(job_id = %id, url = %url, "duplicate_article");
                Ok(())
            }
            Err(e) => {
                tracing::error!(job_id = %record.id, error = %e, "store_error");
                Err(e)
            }
        }
    }

    async fn notify(&self, notification: &JobNotification) {
        if let Err(e) = self.notifier.send(notification).await {
            counter!("notifications_failed_total").increment(1);
            tracing::error!(job_id = %notification.job_id, error = %e, "notification_failed");
        }
    }
}

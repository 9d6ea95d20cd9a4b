// src/error.rs
//! Error taxonomy for the job-processing path.
//!
//! Only `StoreError::Backend` and `QueueError` (from the dead-letter push) are
//! allowed to escape a job's processing; everything raised inside a single
//! attempt is folded into the retry state machine.

use thiserror::Error;

/// Outcome of a single GET against the article URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network, DNS, TLS, timeout or body-read failure.
    #[error("transient fetch error: {cause}")]
    Transient { cause: String },

    /// The server answered, but not with a 2xx.
    #[error("HTTP status {status_code}")]
    HttpStatus { status_code: u16 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("document could not be parsed: {0}")]
    Parse(String),
}

/// Everything that can make one attempt fail. Retried uniformly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation (duplicate `url` under another id). Non-fatal.
    #[error("article {id} conflicts with an existing document for {url}")]
    Conflict { id: String, url: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Fatal for the current job; surfaced to the consumer loop.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("storing article failed: {0}")]
    Store(#[from] StoreError),

    #[error("dead-letter push failed: {0}")]
    DeadLetter(#[from] QueueError),
}

/// Payload popped from the work channel did not describe a valid job.
#[derive(Debug, Error)]
pub enum JobDecodeError {
    #[error("malformed job payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid job: {0}")]
    Invalid(String),
}

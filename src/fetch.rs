// src/fetch.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};

use crate::decode::charset_from_content_type;
use crate::error::FetchError;

/// Descriptive user agent sent with every article fetch.
pub const USER_AGENT: &str = concat!(
    "article-pipeline/",
    env!("CARGO_PKG_VERSION"),
    " (+metadata fetcher; Mozilla/5.0 compatible)"
);

/// Upper bound on redirects followed for one fetch.
const MAX_REDIRECTS: usize = 10;

pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// A 2xx response, body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: Vec<u8>,
    /// `charset` from the response `Content-Type`, if any.
    pub charset: Option<String>,
}

/// Where article documents come from. One call = one request, no retries.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str, job_id: &str) -> Result<FetchedPage, FetchError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn oversized(&self, job_id: &str, seen: u64) -> FetchError {
        tracing::warn!(job_id, bytes = seen, limit = self.max_body_bytes, "http_body_too_large");
        FetchError::Transient {
            cause: format!("response body exceeds {} bytes", self.max_body_bytes),
        }
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str, job_id: &str) -> Result<FetchedPage, FetchError> {
        tracing::info!(job_id, url, "scraping_started");
        let t0 = Instant::now();

        let mut rsp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(job_id, error = %e, "http_request_error");
            FetchError::Transient {
                cause: e.to_string(),
            }
        })?;

        let status = rsp.status();
        if !status.is_success() {
            tracing::warn!(job_id, status_code = status.as_u16(), "http_status_error");
            return Err(FetchError::HttpStatus {
                status_code: status.as_u16(),
            });
        }

        let charset = rsp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        // Declared length is checked up front; the streamed total is checked
        // as well since the header can be absent or wrong.
        let declared = rsp.content_length();
        if let Some(len) = declared {
            if len > self.max_body_bytes as u64 {
                return Err(self.oversized(job_id, len));
            }
        }
        let capacity = declared.map_or(0, |len| usize::try_from(len).unwrap_or(0));
        let mut body = Vec::with_capacity(capacity);
        loop {
            let chunk = rsp.chunk().await.map_err(|e| {
                tracing::warn!(job_id, error = %e, "http_body_error");
                FetchError::Transient {
                    cause: e.to_string(),
                }
            })?;
            let Some(chunk) = chunk else { break };
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.oversized(job_id, (body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }

        histogram!("fetch_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(
            job_id,
            status_code = status.as_u16(),
            content_length = body.len(),
            "http_request_success"
        );

        Ok(FetchedPage {
            status: status.as_u16(),
            body,
            charset,
        })
    }
}

// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use article_pipeline::error::{FetchError, NotifyError, QueueError, StoreError};
use article_pipeline::fetch::{FetchedPage, PageSource};
use article_pipeline::model::{ArticleRecord, Job, Priority};
use article_pipeline::notify::{JobNotification, Notifier};
use article_pipeline::queue::{JobQueue, MemoryQueue};
use article_pipeline::store::{ArticleStore, MemoryStore};
use article_pipeline::{DeadLetterRouter, JobProcessor, RetryPolicy};

pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

pub fn job(id: &str, url: &str) -> Job {
    Job {
        id: id.to_string(),
        url: url.to_string(),
        source: "Wire".to_string(),
        category: "tech".to_string(),
        priority: Priority::High,
    }
}

pub fn payload(job: &Job) -> String {
    serde_json::to_string(job).expect("job serializes")
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {path}: {e}"))
}

pub fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(&path).unwrap_or_else(|e| panic!("reading {path}: {e}"))
}

pub fn page(html: &str) -> Result<FetchedPage, FetchError> {
    Ok(FetchedPage {
        status: 200,
        body: html.as_bytes().to_vec(),
        charset: None,
    })
}

/// A 200 whose `Content-Type` announced `charset`.
pub fn encoded_page(body: &[u8], charset: &str) -> Result<FetchedPage, FetchError> {
    Ok(FetchedPage {
        status: 200,
        body: body.to_vec(),
        charset: Some(charset.to_string()),
    })
}

pub fn transient(cause: &str) -> Result<FetchedPage, FetchError> {
    Err(FetchError::Transient {
        cause: cause.to_string(),
    })
}

/// Replays a fixed list of responses, then fails every later call.
/// Records the (tokio) instant of every call.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<FetchedPage, FetchError>>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<FetchedPage, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for ScriptedFetcher {
    async fn fetch(&self, _url: &str, _job_id: &str) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| transient("connection refused"))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<JobNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Records every notification but reports each one as rejected.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<JobNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &JobNotification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(NotifyError::Rejected("webhook returned 500".into()));
        }
        Ok(())
    }
}

/// Every upsert fails with a backend error.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: Mutex<Vec<ArticleRecord>>,
}

#[async_trait]
impl ArticleStore for FailingStore {
    async fn upsert(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        self.attempts.lock().unwrap().push(record.clone());
        Err(StoreError::Backend("connection reset by peer".into()))
    }
}

/// Every push fails.
pub struct FailingQueue;

#[async_trait]
impl JobQueue for FailingQueue {
    async fn push(&self, _payload: &str) -> Result<(), QueueError> {
        Err(QueueError::Unavailable("redis down".into()))
    }

    async fn pop(&self, _timeout: Duration) -> Result<Option<String>, QueueError> {
        Err(QueueError::Unavailable("redis down".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A processor wired to in-memory collaborators, with handles kept for
/// assertions.
pub struct Harness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub dlq: Arc<MemoryQueue>,
    pub processor: JobProcessor,
}

pub fn harness(fetcher: ScriptedFetcher, max_retries: u32) -> Harness {
    harness_with(fetcher, RecordingNotifier::default(), max_retries)
}

pub fn harness_with(fetcher: ScriptedFetcher, notifier: RecordingNotifier, max_retries: u32) -> Harness {
    let fetcher = Arc::new(fetcher);
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let dlq = Arc::new(MemoryQueue::new("article_queue:failed"));
    let processor = JobProcessor::new(
        fetcher.clone(),
        store.clone(),
        notifier.clone(),
        DeadLetterRouter::new(dlq.clone()),
        RetryPolicy::new(max_retries, BACKOFF_BASE),
    );
    Harness {
        fetcher,
        store,
        notifier,
        dlq,
        processor,
    }
}

/// Poll `cond` every 10ms until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

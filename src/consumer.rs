// src/consumer.rs
//! Consumer loop: pop one payload, decode, drive it through the retry
//! executor, repeat until cancelled.
//!
//! One job at a time per loop. Shutdown is observed between jobs only: a job
//! already inside its retry sequence runs to a terminal state first.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use metrics::counter;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessError;
use crate::model::Job;
use crate::queue::JobQueue;
use crate::retry::{JobOutcome, JobProcessor};

pub struct Consumer {
    work: Arc<dyn JobQueue>,
    processor: JobProcessor,
    poll_timeout: Duration,
    error_pause: Duration,
}

impl Consumer {
    pub fn new(
        work: Arc<dyn JobQueue>,
        processor: JobProcessor,
        poll_timeout: Duration,
        error_pause: Duration,
    ) -> Self {
        Self {
            work,
            processor,
            poll_timeout,
            error_pause,
        }
    }

    /// Run until `shutdown` is cancelled. Errors and panics from a single job
    /// are logged and followed by a short pause; they never end the loop.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            queue = self.work.name(),
            max_retries = self.processor.policy().max_retries(),
            "consumer_started"
        );

        while !shutdown.is_cancelled() {
            let raw = match self.work.pop(self.poll_timeout).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    counter!("consumer_loop_errors_total").increment(1);
                    tracing::error!(error = %e, queue = self.work.name(), "consumer_loop_error");
                    self.pause(&shutdown).await;
                    continue;
                }
            };

            match AssertUnwindSafe(self.handle_payload(&raw))
                .catch_unwind()
                .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    counter!("consumer_loop_errors_total").increment(1);
                    tracing::error!(error = %e, "consumer_loop_error");
                    self.pause(&shutdown).await;
                }
                Err(panic) => {
                    counter!("consumer_loop_errors_total").increment(1);
                    tracing::error!(panic = %panic_message(panic.as_ref()), "consumer_loop_panic");
                    self.pause(&shutdown).await;
                }
            }
        }

        tracing::info!("consumer_shutting_down");
    }

    /// Decode one dequeued payload and process it.
    ///
    /// `Ok(None)`: the payload was malformed and has been dropped.
    pub async fn handle_payload(&self, raw: &str) -> Result<Option<JobOutcome>, ProcessError> {
        counter!("jobs_received_total").increment(1);

        let job = match Job::decode(raw) {
            Ok(job) => job,
            Err(e) => {
                counter!("jobs_malformed_total").increment(1);
                tracing::warn!(error = %e, payload_len = raw.len(), "malformed_task_dropped");
                return Ok(None);
            }
        };

        self.processor.process(&job, raw).await.map(Some)
    }

    async fn pause(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(self.error_pause) => {}
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

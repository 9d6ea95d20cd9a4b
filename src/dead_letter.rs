// src/dead_letter.rs
use std::sync::Arc;

use metrics::counter;

use crate::error::QueueError;
use crate::queue::JobQueue;

/// Parks the payload of an exhausted job on the failure channel.
#[derive(Clone)]
pub struct DeadLetterRouter {
    channel: Arc<dyn JobQueue>,
}

impl DeadLetterRouter {
    pub fn new(channel: Arc<dyn JobQueue>) -> Self {
        Self { channel }
    }

    /// Push `raw` exactly as it was dequeued. Single attempt; a failed push is
    /// returned to the caller untouched.
    pub async fn route(&self, job_id: &str, raw: &str) -> Result<(), QueueError> {
        self.channel.push(raw).await?;
        counter!("jobs_dead_lettered_total").increment(1);
        tracing::info!(job_id, dlq = self.channel.name(), "task_moved_to_dlq");
        Ok(())
    }
}

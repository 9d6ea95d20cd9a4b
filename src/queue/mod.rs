// src/queue/mod.rs
//! Work and failure channels.
//!
//! Both are list-like: producers push to the head, consumers pop from the
//! tail, so waiting items are handled in publish order under a single
//! producer. Pops are atomic (each payload reaches exactly one consumer) and
//! unacknowledged: a consumer that dies mid-job loses that job.

pub mod memory;
pub mod redis_list;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;

pub use self::memory::MemoryQueue;
pub use self::redis_list::RedisQueue;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a raw payload at the head of the channel.
    async fn push(&self, payload: &str) -> Result<(), QueueError>;

    /// Take the oldest payload, waiting at most `timeout`.
    /// `Ok(None)` means the wait timed out with nothing available.
    async fn pop(&self, timeout: Duration) -> Result<Option<String>, QueueError>;

    /// Channel key, for logs.
    fn name(&self) -> &str;
}

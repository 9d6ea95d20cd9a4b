// src/queue/memory.rs
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::JobQueue;
use crate::error::QueueError;

/// In-process channel with the same head-push / tail-pop discipline as the
/// Redis list. Used by tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    name: String,
    items: Mutex<VecDeque<String>>,
    ready: Notify,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payloads in pop order (oldest first), without consuming them.
    pub fn snapshot(&self) -> Vec<String> {
        let items = self.items.lock().expect("queue mutex poisoned");
        items.iter().rev().cloned().collect()
    }

    fn try_pop(&self) -> Option<String> {
        self.items.lock().expect("queue mutex poisoned").pop_back()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn push(&self, payload: &str) -> Result<(), QueueError> {
        self.items
            .lock()
            .expect("queue mutex poisoned")
            .push_front(payload.to_string());
        self.ready.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_pop() {
                return Ok(Some(item));
            }
            if tokio::time::timeout_at(deadline, self.ready.notified())
                .await
                .is_err()
            {
                return Ok(self.try_pop());
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

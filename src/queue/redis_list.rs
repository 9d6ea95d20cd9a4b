// src/queue/redis_list.rs
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::JobQueue;
use crate::error::QueueError;

/// Redis list used as a channel: LPUSH to produce, BRPOP to consume.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    key: String,
}

impl RedisQueue {
    /// Open a managed connection and verify it with PING.
    pub async fn connect(redis_url: &str, key: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(Self::from_connection(conn, key))
    }

    /// Share an existing connection, e.g. between the work and failure channels.
    pub fn from_connection(conn: ConnectionManager, key: &str) -> Self {
        Self {
            conn,
            key: key.to_string(),
        }
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn push(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(&self.key, payload).await?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        // Integer seconds keep older servers happy; 0 would block forever.
        let timeout_secs = timeout.as_secs().max(1);

        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        Ok(popped.map(|(_key, payload)| payload))
    }

    fn name(&self) -> &str {
        &self.key
    }
}

// src/store/mod.rs
//! Article persistence: whole-document upsert keyed by job id, with `url`
//! unique across documents.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::ArticleRecord;

pub use self::memory::MemoryStore;
pub use self::postgres::PgArticleStore;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert, or fully replace the document with the same id. A record whose
    /// `url` already belongs to a different id fails with
    /// [`StoreError::Conflict`] and leaves the store unchanged.
    async fn upsert(&self, record: &ArticleRecord) -> Result<(), StoreError>;
}

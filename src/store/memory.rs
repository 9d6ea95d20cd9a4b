// src/store/memory.rs
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::ArticleStore;
use crate::error::StoreError;
use crate::model::ArticleRecord;

/// Map-backed store enforcing the same id/url rules as the database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, ArticleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<ArticleRecord> {
        self.docs.lock().expect("store mutex poisoned").get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn upsert(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().expect("store mutex poisoned");
        let taken = docs
            .values()
            .any(|d| d.url == record.url && d.id != record.id);
        if taken {
            return Err(StoreError::Conflict {
                id: record.id.clone(),
                url: record.url.clone(),
            });
        }
        docs.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

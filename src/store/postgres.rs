// src/store/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::ArticleStore;
use crate::error::StoreError;
use crate::model::ArticleRecord;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const SCHEMA: &[(&str, &str)] = &[
    (
        "articles_table",
        "CREATE TABLE IF NOT EXISTS articles (
            id              TEXT PRIMARY KEY,
            url             TEXT NOT NULL,
            source          TEXT NOT NULL,
            category        TEXT NOT NULL,
            priority        TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            attempts        INTEGER NOT NULL DEFAULT 0,
            error_message   TEXT,
            title           TEXT,
            description     TEXT,
            author          TEXT,
            published_date  TEXT,
            http_status     INTEGER,
            fetched_at      TIMESTAMPTZ,
            updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
    (
        "url_unique_index",
        "CREATE UNIQUE INDEX IF NOT EXISTS url_unique_index ON articles (url)",
    ),
    (
        "status_index",
        "CREATE INDEX IF NOT EXISTS status_index ON articles (status)",
    ),
    (
        "fetched_at_index",
        "CREATE INDEX IF NOT EXISTS fetched_at_index ON articles (fetched_at)",
    ),
    (
        "status_fetched_at_index",
        "CREATE INDEX IF NOT EXISTS status_fetched_at_index ON articles (status, fetched_at)",
    ),
];

// Every column is overwritten so a success never inherits a stale error_message
// (and a failure never keeps an old title).
const UPSERT: &str = "INSERT INTO articles (
        id, url, source, category, priority, status, attempts, error_message,
        title, description, author, published_date, http_status, fetched_at, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now())
    ON CONFLICT (id) DO UPDATE SET
        url = EXCLUDED.url,
        source = EXCLUDED.source,
        category = EXCLUDED.category,
        priority = EXCLUDED.priority,
        status = EXCLUDED.status,
        attempts = EXCLUDED.attempts,
        error_message = EXCLUDED.error_message,
        title = EXCLUDED.title,
        description = EXCLUDED.description,
        author = EXCLUDED.author,
        published_date = EXCLUDED.published_date,
        http_status = EXCLUDED.http_status,
        fetched_at = EXCLUDED.fetched_at,
        updated_at = EXCLUDED.updated_at";

/// PostgreSQL article store.
#[derive(Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .connect(database_url)
            .await
            .map_err(backend)?;
        tracing::info!(max_connections = DEFAULT_MAX_CONNECTIONS, "postgres_connected");
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `articles` table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for (name, ddl) in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
            tracing::info!(object = name, "schema_object_ensured");
        }
        tracing::info!(table = "articles", "store_schema_ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn upsert(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        let attempts = i32::try_from(record.attempts).unwrap_or(i32::MAX);
        sqlx::query(UPSERT)
            .bind(&record.id)
            .bind(&record.url)
            .bind(&record.source)
            .bind(&record.category)
            .bind(record.priority.as_str())
            .bind(record.status.as_str())
            .bind(attempts)
            .bind(&record.error_message)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.author)
            .bind(&record.published_date)
            .bind(record.http_status.map(i32::from))
            .bind(record.fetched_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
                if unique {
                    StoreError::Conflict {
                        id: record.id.clone(),
                        url: record.url.clone(),
                    }
                } else {
                    backend(e)
                }
            })?;
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

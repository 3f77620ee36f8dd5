//! SQLite-backed document store
//!
//! Every collection lives in one `documents` table keyed by
//! `(collection, id)`; bodies are JSON text. Queries scan the collection
//! and evaluate filters in process.

use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use super::{new_document_id, Document, DocumentStore, DocumentWrite, Fields, Query};
use crate::errors::{PromptShareError, Result};

pub const SCHEMA: &str = "
-- All collections share one table
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,      -- Collection name: prompts, usernames, accounts, credentials
    id TEXT NOT NULL,              -- Store-assigned or caller-chosen key
    data TEXT NOT NULL,            -- JSON object body
    created_at INTEGER NOT NULL,   -- Unix timestamp (seconds)
    updated_at INTEGER NOT NULL,   -- Unix timestamp (seconds)
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database; one connection so every query sees it
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA.split(';') {
            if statement.trim().is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::debug!("sqlite document store ready");
        Ok(Self { pool })
    }

    fn encode(data: &Fields) -> Result<String> {
        Ok(serde_json::to_string(data)?)
    }

    fn decode(id: String, data: &str) -> Result<Document> {
        match serde_json::from_str::<Value>(data)? {
            Value::Object(fields) => Ok(Document::new(id, fields)),
            _ => Err(PromptShareError::Store(format!(
                "document '{}' body is not an object",
                id
            ))),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn add(&self, collection: &str, write: DocumentWrite) -> Result<String> {
        let id = new_document_id();
        let body = Self::encode(&write.resolve())?;
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(&body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT id, data FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, data)| Self::decode(id, &data)).transpose()
    }

    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<()> {
        let body = Self::encode(&write.resolve())?;
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<bool> {
        let body = Self::encode(&write.resolve())?;
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO NOTHING",
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT id, data FROM documents WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let docs = rows
            .into_iter()
            .map(|(id, data)| Self::decode(id, &data))
            .collect::<Result<Vec<_>>>()?;

        Ok(query.apply(docs))
    }
}

//! SQLite-backed long-term memory store.
//!
//! Records are keyed `(namespace, user_id, key)` and upserted whole; the
//! merge policy runs in the engine before `put`, so the store never needs
//! to understand the payload.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use quill_core::memory::MemoryStore;
use quill_types::error::MemoryError;

use super::pool::DatabasePool;

pub struct SqliteMemoryStore {
    pool: DatabasePool,
}

impl SqliteMemoryStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: sqlx::Error) -> MemoryError {
    MemoryError::Storage(e.to_string())
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn setup(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS memory_records (
                namespace TEXT NOT NULL,
                user_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, user_id, key)
            )"#,
        )
        .execute(&self.pool.writer)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get(
        &self,
        namespace: &str,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Value>, MemoryError> {
        let row = sqlx::query(
            "SELECT value FROM memory_records WHERE namespace = ? AND user_id = ? AND key = ?",
        )
        .bind(namespace)
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("value").map_err(storage_err)?;
        let value =
            serde_json::from_str(&raw).map_err(|e| MemoryError::Serialization(e.to_string()))?;
        Ok(Some(value))
    }

    async fn put(
        &self,
        namespace: &str,
        user_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<(), MemoryError> {
        let raw =
            serde_json::to_string(value).map_err(|e| MemoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO memory_records (namespace, user_id, key, value, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(namespace, user_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
        )
        .bind(namespace)
        .bind(user_id)
        .bind(key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

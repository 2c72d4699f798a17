//! SQLite-backed checkpointer.
//!
//! One row per conversation holding the latest snapshot; `put` upserts.
//! State is stored as a JSON column rather than normalized tables: the
//! engine always reads and writes whole snapshots, never queries inside
//! them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use quill_core::checkpoint::{Checkpoint, Checkpointer};
use quill_types::error::CheckpointError;
use quill_types::state::ConversationState;

use super::pool::DatabasePool;

pub struct SqliteCheckpointer {
    pool: DatabasePool,
}

impl SqliteCheckpointer {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: sqlx::Error) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS checkpoints (
                conversation_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                node TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool.writer)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let state = serde_json::to_string(&checkpoint.state)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO checkpoints (conversation_id, state, node, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(conversation_id) DO UPDATE SET
                   state = excluded.state,
                   node = excluded.node,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&checkpoint.conversation_id)
        .bind(state)
        .bind(&checkpoint.node)
        .bind(checkpoint.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get(&self, conversation_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let row = sqlx::query(
            "SELECT state, node, updated_at FROM checkpoints WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.try_get("state").map_err(storage_err)?;
        let node: String = row.try_get("node").map_err(storage_err)?;
        let updated_at_raw: String = row.try_get("updated_at").map_err(storage_err)?;

        let state: ConversationState = serde_json::from_str(&state_json)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CheckpointError::Serialization(format!("invalid datetime: {e}")))?;

        Ok(Some(Checkpoint {
            conversation_id: conversation_id.to_string(),
            state,
            node,
            updated_at,
        }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

//! Volatile in-process checkpointer.
//!
//! Data is lost on restart; useful for tests and development. The durable
//! backend is `quill_infra::sqlite::SqliteCheckpointer`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_types::error::CheckpointError;

use super::{Checkpoint, Checkpointer};

/// In-memory checkpoint store keyed by conversation id.
#[derive(Default)]
pub struct MemoryCheckpointer {
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.checkpoints
            .write()
            .await
            .insert(checkpoint.conversation_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get(&self, conversation_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.checkpoints.read().await.get(conversation_id).cloned())
    }
}

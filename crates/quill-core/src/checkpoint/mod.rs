//! Checkpoint store contract and the volatile in-process backend.
//!
//! A checkpoint is the durable serialization of [`ConversationState`] plus
//! graph-position metadata, keyed by conversation id and written after
//! every node transition. Nodes are checkpointer-agnostic: swapping the
//! in-memory backend for the SQLite one (quill-infra) changes nothing in
//! node behavior.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_types::error::CheckpointError;
use quill_types::state::ConversationState;

pub use memory::MemoryCheckpointer;

/// Durable snapshot of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub conversation_id: String,
    pub state: ConversationState,
    /// The graph node whose output this snapshot reflects.
    pub node: String,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(conversation_id: impl Into<String>, state: ConversationState, node: &str) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            state,
            node: node.to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// Keyed, durable persistence of graph state.
///
/// The orchestration graph exclusively owns its checkpointer handle for its
/// lifetime; no other component may close it.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Idempotent schema/connection initialization.
    async fn setup(&self) -> Result<(), CheckpointError>;

    /// Durably record the latest snapshot for its conversation id.
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// The most recently durable snapshot, or `None` if unknown.
    async fn get(&self, conversation_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Release underlying resources. Called exactly once at shutdown.
    async fn close(&self) {}
}

//! Conversation history endpoint.
//!
//! GET /api/v1/chat/history?checkpoint_id=...
//!
//! Returns the full reconstructed message list from the latest snapshot,
//! tool entries included. Unknown checkpoints and conversations with no
//! messages are both 404.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use quill_types::message::ChatMessage;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub checkpoint_id: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for HistoryMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub checkpoint_id: String,
    pub messages: Vec<HistoryMessage>,
    pub message_count: usize,
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let graph = state
        .manager
        .graph()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let checkpoint = graph
        .get_state(&params.checkpoint_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::CheckpointNotFound(params.checkpoint_id.clone()))?;

    if checkpoint.state.messages.is_empty() {
        return Err(AppError::CheckpointNotFound(params.checkpoint_id.clone()));
    }

    let messages: Vec<HistoryMessage> = checkpoint
        .state
        .messages
        .iter()
        .map(HistoryMessage::from)
        .collect();

    let message_count = messages.len();
    Ok(Json(HistoryResponse {
        checkpoint_id: params.checkpoint_id,
        messages,
        message_count,
    }))
}

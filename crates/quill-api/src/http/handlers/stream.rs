//! SSE streaming chat endpoint.
//!
//! GET /api/v1/chat/stream?message=...&checkpoint_id=...
//!
//! Streams one turn as Server-Sent Events, each carrying one JSON-encoded
//! turn event (`checkpoint`, `content`, `search_start`, `search_result`,
//! `date_result`, `end`). The admission permit is moved into the stream so
//! the slot is held for the stream's whole lifetime and released on every
//! exit path, disconnects included.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use quill_core::stream::{StreamingBridge, TurnRequest};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamChatParams {
    /// The user message for this turn.
    pub message: String,
    /// Existing conversation to continue; absent starts a new one.
    pub checkpoint_id: Option<String>,
}

pub async fn stream_chat(
    State(state): State<AppState>,
    Query(params): Query<StreamChatParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if params.message.trim().is_empty() {
        return Err(AppError::Validation(
            "message must not be empty".to_string(),
        ));
    }

    let permit = state.limiter.try_acquire().await?;
    let graph = state
        .manager
        .graph()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let turn = StreamingBridge::stream(
        graph,
        TurnRequest {
            message: params.message,
            checkpoint_id: params.checkpoint_id,
            user_id: state.settings.user_id.clone(),
        },
    );

    let sse_stream = async_stream::stream! {
        // Slot held until this stream is dropped or finishes.
        let _permit = permit;
        let mut turn = std::pin::pin!(turn);
        while let Some(event) = turn.next().await {
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok::<_, Infallible>(Event::default().data(data)),
                Err(e) => tracing::error!(error = %e, "failed to encode turn event"),
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

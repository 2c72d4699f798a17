//! Bridge from internal graph events to the external turn protocol.
//!
//! Protocol rules enforced here, not in nodes: a `checkpoint` event opens
//! the stream only for brand-new conversations (carrying the generated id);
//! a run failure surfaces as a final content marker; exactly one `end`
//! always closes the stream. The graph run itself is detached, so dropping
//! this stream mid-turn abandons delivery without abandoning the turn.

use std::sync::Arc;

use futures_util::Stream;
use uuid::Uuid;

use quill_types::event::TurnEvent;

use crate::graph::{ConversationGraph, GraphEvent};

/// One inbound chat turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    /// Existing conversation to resume; `None` starts a new one.
    pub checkpoint_id: Option<String>,
    pub user_id: String,
}

pub struct StreamingBridge;

impl StreamingBridge {
    /// Run one turn and expose it as an ordered [`TurnEvent`] stream.
    pub fn stream(
        graph: Arc<ConversationGraph>,
        request: TurnRequest,
    ) -> impl Stream<Item = TurnEvent> + Send + 'static {
        let (conversation_id, is_new) = match request.checkpoint_id {
            Some(id) => (id, false),
            None => (Uuid::new_v4().to_string(), true),
        };

        // Started eagerly: the run proceeds even if the stream is never polled.
        let mut rx = graph.run(conversation_id.clone(), request.user_id, request.message);

        async_stream::stream! {
            if is_new {
                yield TurnEvent::Checkpoint {
                    checkpoint_id: conversation_id.clone(),
                };
            }
            while let Some(event) = rx.recv().await {
                match event {
                    GraphEvent::Content { content } => yield TurnEvent::Content { content },
                    GraphEvent::SearchStart { query } => yield TurnEvent::SearchStart { query },
                    GraphEvent::SearchResult { urls } => yield TurnEvent::SearchResult { urls },
                    GraphEvent::DateResult { result } => yield TurnEvent::DateResult { result },
                    GraphEvent::Completed { .. } => break,
                    GraphEvent::Failed { message } => {
                        tracing::error!(conversation_id, message, "turn failed");
                        yield TurnEvent::Content {
                            content: format!("Something went wrong: {message}"),
                        };
                        break;
                    }
                }
            }
            yield TurnEvent::End;
        }
    }
}

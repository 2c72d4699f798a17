//! Internal events produced by a graph run.
//!
//! Nodes emit these into an [`EventSink`]; the streaming bridge translates
//! them into the external `TurnEvent` protocol. Keeping the internal shape
//! separate lets the bridge own protocol concerns (checkpoint announcement,
//! the single terminal `end`) without nodes knowing about them.

use tokio::sync::mpsc;

use quill_types::state::ConversationState;

/// One event from inside a running graph.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// Incremental assistant text.
    Content { content: String },
    /// A search tool call is about to execute.
    SearchStart { query: String },
    /// Source URLs from completed search results.
    SearchResult { urls: Vec<String> },
    /// Formatted date/time tool output.
    DateResult { result: String },
    /// The run finished; carries the final state.
    Completed { state: Box<ConversationState> },
    /// The run failed terminally.
    Failed { message: String },
}

/// Sending half of a run's event channel.
///
/// Emission never fails from the node's perspective: a dropped receiver
/// (client disconnect) silently discards events while the run and its
/// checkpoint writes continue.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<GraphEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<GraphEvent>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: GraphEvent) {
        let _ = self.tx.send(event).await;
    }
}

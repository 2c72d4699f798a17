//! External stream protocol events.
//!
//! `TurnEvent` is the ordered, externally-consumable event sequence for one
//! streamed turn: an optional `checkpoint` (new conversations only), zero or
//! more `content` fragments and tool markers, then exactly one `end`.
//! Serialized with a `type` discriminator so browser clients can switch on
//! it directly.

use serde::{Deserialize, Serialize};

/// One externally visible event in a streamed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Emitted once, immediately, only for a brand-new conversation.
    Checkpoint { checkpoint_id: String },
    /// Incremental text fragment; concatenate in emission order.
    Content { content: String },
    /// A search tool call is about to execute.
    SearchStart { query: String },
    /// Source URLs extracted from search results. Omitted entirely when
    /// zero URLs were found.
    SearchResult { urls: Vec<String> },
    /// Formatted output of the date/time tool.
    DateResult { result: String },
    /// Terminal event, emitted exactly once per stream.
    End,
}

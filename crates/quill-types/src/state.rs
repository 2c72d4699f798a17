//! Conversation state and its merge semantics.
//!
//! `ConversationState` is the unit of work threaded through every graph
//! node. Nodes return partial `StateUpdate`s rather than whole states; the
//! reducer in [`ConversationState::apply`] composes them. Message history is
//! an append log with explicit tombstones: `MessageOp::Append` adds an
//! entry, `MessageOp::Remove` deletes a previously appended entry by
//! identity. This is the sole mechanism summarization uses to bound context
//! growth without replaying whole state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::ChatMessage;

/// One operation against the message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MessageOp {
    /// Append a new entry to the end of the log.
    Append(ChatMessage),
    /// Delete the entry with this id. Unknown ids are ignored.
    Remove { id: Uuid },
}

/// Partial state contributed by a single node.
///
/// `None` scalar fields pass the prior value through unchanged; `Some`
/// overwrites it. Message operations are applied in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    pub query: Option<Vec<String>>,
    pub answer: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageOp>,
    /// Increment for the decision-node invocation counter.
    #[serde(default)]
    pub runs: u32,
}

impl StateUpdate {
    /// An update that only appends messages.
    pub fn append_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: messages.into_iter().map(MessageOp::Append).collect(),
            ..Self::default()
        }
    }
}

/// The mutable record threaded through every orchestration step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Pending user-turn messages not yet folded into `messages`,
    /// in submission order.
    #[serde(default)]
    pub query: Vec<String>,
    /// Ordered conversation history. Append/removal only; never reordered,
    /// never mutated in place.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Most recent assistant text output. Derived and transient.
    #[serde(default)]
    pub answer: String,
    /// Rolling digest of everything summarized so far. Empty until the
    /// first summarization fires; monotonic afterwards.
    #[serde(default)]
    pub summary: String,
    /// Decision-node invocation count for this conversation.
    #[serde(default)]
    pub runs: u32,
}

impl ConversationState {
    /// Apply a node's partial update to this state.
    ///
    /// Scalars: `Some` overwrites, `None` passes through. Message ops are
    /// applied in order; `Remove` with an unknown id is a no-op.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(query) = update.query {
            self.query = query;
        }
        if let Some(answer) = update.answer {
            self.answer = answer;
        }
        if let Some(summary) = update.summary {
            self.summary = summary;
        }
        for op in update.messages {
            match op {
                MessageOp::Append(msg) => self.messages.push(msg),
                MessageOp::Remove { id } => self.messages.retain(|m| m.id != id),
            }
        }
        self.runs += update.runs;
    }

    /// The latest assistant message, if any.
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::message::ChatRole::Assistant)
    }
}

//! The conversation orchestration graph.
//!
//! `START → llm_call → (tools → llm_call)* → [summarize] → END`, with
//! per-node retry and a checkpoint written after every transition. The only
//! cycle is decision → tools → decision.

pub mod engine;
pub mod event;
pub mod nodes;
pub mod prompts;
pub mod retry;
pub mod routing;

pub use engine::{ConversationGraph, GraphConfig};
pub use event::{EventSink, GraphEvent};
pub use retry::RetryPolicy;
pub use routing::Next;

/// Node names, recorded on checkpoints as the graph position.
pub const NODE_LLM_CALL: &str = "llm_call";
pub const NODE_TOOLS: &str = "tools";
pub const NODE_SUMMARIZE: &str = "summarize";

//! Graph nodes: decision, tool execution, summarization.
//!
//! Nodes are pure-ish async functions over `&ConversationState` returning a
//! `StateUpdate`; the engine applies updates, checkpoints, and routes.

pub mod llm_call;
pub mod summarize;
pub mod tools;

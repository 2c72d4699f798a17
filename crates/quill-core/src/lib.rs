//! Conversation orchestration engine for Quill.
//!
//! The core is a small node/edge state machine: a decision node that calls
//! the LLM with a tool set, a tool execution node, and a summarization node
//! that bounds context growth, wired with conditional routing and per-node
//! retry. State is checkpointed after every node transition through a
//! pluggable [`checkpoint::Checkpointer`]; long-term user facts live in a
//! separate [`memory::MemoryStore`]. The [`stream::StreamingBridge`] exposes
//! a run's internal events as the external turn protocol.

pub mod admission;
pub mod checkpoint;
pub mod graph;
pub mod llm;
pub mod manager;
pub mod memory;
pub mod stream;
pub mod tool;

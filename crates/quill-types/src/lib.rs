//! Shared domain types for Quill.
//!
//! Leaf crate with no business logic: conversation state and its merge
//! semantics, message and tool-call shapes, LLM request/response types,
//! the external stream protocol, and error enums.

pub mod error;
pub mod event;
pub mod llm;
pub mod message;
pub mod state;

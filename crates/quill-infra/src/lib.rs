//! Infrastructure backends for Quill.
//!
//! Durable SQLite stores for checkpoints and long-term memory, the
//! OpenAI-compatible LLM provider, the Tavily web-search tool, and
//! env-based settings. Everything here implements seams defined in
//! `quill-core`; nothing in the engine depends on this crate.

pub mod config;
pub mod llm;
pub mod search;
pub mod sqlite;

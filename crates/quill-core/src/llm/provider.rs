//! LlmProvider trait definition.
//!
//! The core abstraction all LLM backends implement. Uses RPITIT for
//! `complete` and `Pin<Box<dyn Stream>>` for `stream` (streams need to be
//! object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use quill_types::llm::{CompletionRequest, CompletionResponse, LlmError, LlmStreamEvent};

/// Trait for LLM provider backends.
///
/// Implementations live in quill-infra (e.g. `OpenAiCompatibleProvider`).
/// Requests may carry a tool set the model can elect to invoke; tool-call
/// requests come back either on the response (`complete`) or as
/// [`LlmStreamEvent::ToolCallComplete`] events (`stream`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openrouter", "groq").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<LlmStreamEvent, LlmError>> + Send + 'static>>;
}

//! LLM request/response types for Quill.
//!
//! These model the data shapes for provider interactions: completion
//! requests with an offered tool set, streaming events, and error handling.
//! Provider implementations live in quill-infra.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ToolCall;

/// Specification of a tool offered to the model.
///
/// `parameters` is a JSON Schema object describing the tool's arguments,
/// in the shape OpenAI-compatible backends expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Role of a message on the LLM wire.
///
/// Distinct from `ChatRole` only in that wire messages always exist in the
/// context of one request; conversion is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
    /// Tool calls previously issued by the assistant (assistant messages).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Originating call id (tool messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(WireRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(WireRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(WireRole::Assistant, content)
    }

    fn plain(role: WireRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// Request to an LLM provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Tools the model may elect to invoke. Empty = no tools offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    /// Copy of this request with the tool set stripped.
    ///
    /// Used by the decision node's tool-schema fallback path.
    pub fn without_tools(&self) -> Self {
        Self {
            tools: Vec::new(),
            ..self.clone()
        }
    }
}

/// Response from a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub model: String,
}

/// Events emitted during a streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmStreamEvent {
    /// A delta of text content.
    TextDelta { text: String },
    /// A tool call fully assembled from streamed fragments.
    ToolCallComplete(ToolCall),
    /// The stream has completed.
    Done,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited")]
    RateLimited,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl LlmError {
    /// Whether this failure plausibly stems from the attached tool schemas.
    ///
    /// Only this class of error may trigger the decision node's tool-free
    /// fallback; network/auth failures must surface to the retry policy.
    pub fn is_tool_schema_error(&self) -> bool {
        matches!(self, LlmError::InvalidRequest(_))
    }
}

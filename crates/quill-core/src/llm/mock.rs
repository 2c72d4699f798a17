//! Scripted LLM provider for engine and node tests.
//!
//! Each call (streaming or not) consumes the next step from the script.
//! An exhausted script yields a provider error, which makes accidental
//! extra calls visible in tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;

use futures_util::Stream;

use quill_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, LlmStreamEvent,
};
use quill_types::message::ToolCall;

use super::provider::LlmProvider;

/// One scripted provider interaction.
pub enum MockStep {
    /// Respond with text and optional tool calls.
    Respond {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Fail with `LlmError::InvalidRequest` (tool-schema class).
    FailInvalid,
    /// Fail with a generic provider error.
    FailProvider,
}

impl MockStep {
    pub fn text(text: impl Into<String>) -> Self {
        MockStep::Respond {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(call: ToolCall) -> Self {
        MockStep::Respond {
            text: String::new(),
            tool_calls: vec![call],
        }
    }
}

/// Scripted provider: pops one [`MockStep`] per call.
pub struct MockProvider {
    script: Mutex<VecDeque<MockStep>>,
}

impl MockProvider {
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
        }
    }

    fn next_step(&self) -> MockStep {
        self.script
            .lock()
            .expect("mock script lock")
            .pop_front()
            .unwrap_or(MockStep::FailProvider)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match self.next_step() {
            MockStep::Respond { text, tool_calls } => Ok(CompletionResponse {
                content: text,
                tool_calls,
                model: "mock-model".to_string(),
            }),
            MockStep::FailInvalid => Err(LlmError::InvalidRequest("mock schema rejection".into())),
            MockStep::FailProvider => Err(LlmError::Provider("mock failure".into())),
        }
    }

    fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<LlmStreamEvent, LlmError>> + Send + 'static>> {
        let step = self.next_step();
        Box::pin(async_stream::stream! {
            match step {
                MockStep::Respond { text, tool_calls } => {
                    // Split text into two deltas to exercise concatenation.
                    if !text.is_empty() {
                        let mid = text.len() / 2;
                        let mid = text
                            .char_indices()
                            .map(|(i, _)| i)
                            .find(|&i| i >= mid)
                            .unwrap_or(0);
                        let (a, b) = text.split_at(mid);
                        if !a.is_empty() {
                            yield Ok(LlmStreamEvent::TextDelta { text: a.to_string() });
                        }
                        if !b.is_empty() {
                            yield Ok(LlmStreamEvent::TextDelta { text: b.to_string() });
                        }
                    }
                    for call in tool_calls {
                        yield Ok(LlmStreamEvent::ToolCallComplete(call));
                    }
                    yield Ok(LlmStreamEvent::Done);
                }
                MockStep::FailInvalid => {
                    yield Err(LlmError::InvalidRequest("mock schema rejection".into()));
                }
                MockStep::FailProvider => {
                    yield Err(LlmError::Provider("mock failure".into()));
                }
            }
        })
    }
}

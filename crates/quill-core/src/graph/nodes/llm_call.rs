//! Decision/generation node.
//!
//! Builds the full model context, offers the tool set, and streams the
//! completion. Text deltas reach the event sink as they arrive. The output
//! update folds the pending query into the history, appends the assistant
//! response (with any tool calls), and bumps the run counter.

use futures_util::StreamExt;
use serde_json::Value;

use quill_types::llm::{
    CompletionRequest, LlmError, LlmStreamEvent, ToolSpec, WireMessage, WireRole,
};
use quill_types::message::{ChatMessage, ChatRole, ToolCall};
use quill_types::state::{ConversationState, StateUpdate};

use crate::graph::event::{EventSink, GraphEvent};
use crate::graph::prompts;
use crate::llm::box_provider::BoxLlmProvider;

const MAX_COMPLETION_TOKENS: u32 = 4096;

#[tracing::instrument(
    name = "llm_call",
    skip_all,
    fields(runs = state.runs, pending = state.query.len())
)]
pub async fn run(
    provider: &BoxLlmProvider,
    model: &str,
    state: &ConversationState,
    tools: &[ToolSpec],
    memory: Option<&Value>,
    sink: &EventSink,
) -> Result<StateUpdate, LlmError> {
    let request = build_request(model, state, tools, memory);

    let (text, tool_calls) = match consume_stream(provider, request.clone(), sink).await {
        Ok(parts) => parts,
        // A schema rejection gets one tool-free attempt. Only safe while no
        // content has been forwarded; providers reject schemas up front.
        Err(e) if e.is_tool_schema_error() && !tools.is_empty() => {
            tracing::warn!(error = %e, "tool-bound request rejected, retrying without tools");
            consume_stream(provider, request.without_tools(), sink).await?
        }
        Err(e) => return Err(e),
    };

    let mut ops = StateUpdate::append_messages(
        state
            .query
            .iter()
            .map(ChatMessage::user)
            .collect::<Vec<_>>(),
    );
    let assistant = if tool_calls.is_empty() {
        ChatMessage::assistant(&text)
    } else {
        ChatMessage::assistant_with_tools(&text, tool_calls)
    };
    ops.messages
        .push(quill_types::state::MessageOp::Append(assistant));
    ops.query = Some(Vec::new());
    ops.answer = Some(text);
    ops.runs = 1;
    Ok(ops)
}

fn build_request(
    model: &str,
    state: &ConversationState,
    tools: &[ToolSpec],
    memory: Option<&Value>,
) -> CompletionRequest {
    let mut messages = Vec::with_capacity(state.messages.len() + state.query.len() + 1);
    if !state.summary.is_empty() {
        messages.push(WireMessage::system(format!(
            "Summary of the conversation so far:\n{}",
            state.summary
        )));
    }
    messages.extend(state.messages.iter().map(wire_from_chat));
    messages.extend(state.query.iter().map(WireMessage::user));

    CompletionRequest {
        model: model.to_string(),
        messages,
        system: Some(prompts::system_with_memory(memory)),
        max_tokens: MAX_COMPLETION_TOKENS,
        temperature: None,
        tools: tools.to_vec(),
        stream: true,
    }
}

fn wire_from_chat(msg: &ChatMessage) -> WireMessage {
    WireMessage {
        role: match msg.role {
            ChatRole::System => WireRole::System,
            ChatRole::User => WireRole::User,
            ChatRole::Assistant => WireRole::Assistant,
            ChatRole::Tool => WireRole::Tool,
        },
        content: msg.content.clone(),
        tool_calls: msg.tool_calls.clone(),
        tool_call_id: msg.tool_call_id.clone(),
    }
}

/// Drive one streaming completion, forwarding text deltas to the sink.
async fn consume_stream(
    provider: &BoxLlmProvider,
    request: CompletionRequest,
    sink: &EventSink,
) -> Result<(String, Vec<ToolCall>), LlmError> {
    let mut stream = provider.stream(request);
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    while let Some(event) = stream.next().await {
        match event? {
            LlmStreamEvent::TextDelta { text: delta } => {
                text.push_str(&delta);
                sink.emit(GraphEvent::Content { content: delta }).await;
            }
            LlmStreamEvent::ToolCallComplete(call) => tool_calls.push(call),
            LlmStreamEvent::Done => break,
        }
    }

    Ok((text, tool_calls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{MockProvider, MockStep};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn sink() -> (EventSink, mpsc::Receiver<GraphEvent>) {
        let (tx, rx) = mpsc::channel(32);
        (EventSink::new(tx), rx)
    }

    fn pending_state(query: &str) -> ConversationState {
        ConversationState {
            query: vec![query.to_string()],
            ..ConversationState::default()
        }
    }

    #[tokio::test]
    async fn test_query_folded_and_answer_set() {
        let provider = BoxLlmProvider::new(MockProvider::new(vec![MockStep::text("hello there")]));
        let (sink, mut rx) = sink();
        let mut state = pending_state("hi");

        let update = run(&provider, "mock-model", &state, &[], None, &sink)
            .await
            .unwrap();
        state.apply(update);

        assert!(state.query.is_empty());
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, ChatRole::User);
        assert_eq!(state.messages[0].content, "hi");
        assert_eq!(state.messages[1].role, ChatRole::Assistant);
        assert_eq!(state.answer, "hello there");
        assert_eq!(state.runs, 1);

        // Deltas arrived in order and concatenate to the full answer.
        drop(sink);
        let mut streamed = String::new();
        while let Some(ev) = rx.recv().await {
            if let GraphEvent::Content { content } = ev {
                streamed.push_str(&content);
            }
        }
        assert_eq!(streamed, "hello there");
    }

    #[tokio::test]
    async fn test_tool_calls_carried_on_assistant_message() {
        let call = ToolCall {
            id: "call_7".to_string(),
            name: "web_search".to_string(),
            arguments: json!({"query": "rustconf dates"}),
        };
        let provider = BoxLlmProvider::new(MockProvider::new(vec![MockStep::tool_call(
            call.clone(),
        )]));
        let (sink, _rx) = sink();
        let mut state = pending_state("when is rustconf?");

        let update = run(&provider, "mock-model", &state, &[], None, &sink)
            .await
            .unwrap();
        state.apply(update);

        let assistant = state.last_assistant().unwrap();
        assert!(assistant.has_tool_calls());
        assert_eq!(assistant.tool_calls[0], call);
        assert_eq!(state.answer, "");
    }

    #[tokio::test]
    async fn test_schema_rejection_falls_back_tool_free() {
        let provider = BoxLlmProvider::new(MockProvider::new(vec![
            MockStep::FailInvalid,
            MockStep::text("fallback answer"),
        ]));
        let (sink, _rx) = sink();
        let state = pending_state("hi");
        let tools = [ToolSpec {
            name: "web_search".to_string(),
            description: "search".to_string(),
            parameters: json!({"type": "object"}),
        }];

        let update = run(&provider, "mock-model", &state, &tools, None, &sink)
            .await
            .unwrap();
        assert_eq!(update.answer.as_deref(), Some("fallback answer"));
    }

    #[tokio::test]
    async fn test_provider_error_propagates_without_fallback() {
        let provider = BoxLlmProvider::new(MockProvider::new(vec![MockStep::FailProvider]));
        let (sink, _rx) = sink();
        let state = pending_state("hi");
        let tools = [ToolSpec {
            name: "web_search".to_string(),
            description: "search".to_string(),
            parameters: json!({"type": "object"}),
        }];

        let err = run(&provider, "mock-model", &state, &tools, None, &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Provider(_)));
    }

    #[test]
    fn test_context_assembly_order() {
        let state = ConversationState {
            query: vec!["newest".to_string()],
            messages: vec![ChatMessage::user("older"), ChatMessage::assistant("reply")],
            summary: "earlier topics".to_string(),
            ..ConversationState::default()
        };
        let req = build_request("m", &state, &[], Some(&json!({"name": "Alex"})));

        assert!(req.system.as_deref().unwrap().contains("Alex"));
        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[0].role, WireRole::System);
        assert!(req.messages[0].content.contains("earlier topics"));
        assert_eq!(req.messages[1].content, "older");
        assert_eq!(req.messages[2].content, "reply");
        assert_eq!(req.messages[3].content, "newest");
        assert_eq!(req.messages[3].role, WireRole::User);
    }
}

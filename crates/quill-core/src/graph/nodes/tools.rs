//! Tool execution node.
//!
//! Runs every tool call on the latest assistant message through the
//! registry, in request order, and folds results back as tool messages
//! correlated by call id. Search and date/time calls additionally emit
//! progress events to the sink.

use quill_types::error::ToolError;
use quill_types::message::ChatMessage;
use quill_types::state::{ConversationState, StateUpdate};

use crate::graph::event::{EventSink, GraphEvent};
use crate::tool::{ToolRegistry, DATE_TIME_TOOL, SEARCH_TOOL};

#[tracing::instrument(name = "tools", skip_all)]
pub async fn run(
    registry: &ToolRegistry,
    state: &ConversationState,
    sink: &EventSink,
) -> Result<StateUpdate, ToolError> {
    let calls = state
        .last_assistant()
        .map(|m| m.tool_calls.clone())
        .unwrap_or_default();

    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        let tool = registry.get(&call.name)?;

        if call.name == SEARCH_TOOL {
            let query = call
                .arguments
                .get("query")
                .and_then(|q| q.as_str())
                .unwrap_or_default()
                .to_string();
            sink.emit(GraphEvent::SearchStart { query }).await;
        }

        tracing::debug!(tool = %call.name, call_id = %call.id, "invoking tool");
        let output = tool.invoke(&call.arguments).await?;

        match call.name.as_str() {
            SEARCH_TOOL if !output.urls.is_empty() => {
                sink.emit(GraphEvent::SearchResult {
                    urls: output.urls.clone(),
                })
                .await;
            }
            DATE_TIME_TOOL => {
                let result = output
                    .display
                    .clone()
                    .unwrap_or_else(|| output.content.clone());
                sink.emit(GraphEvent::DateResult { result }).await;
            }
            _ => {}
        }

        results.push(ChatMessage::tool_result(&call.id, output.content));
    }

    Ok(StateUpdate::append_messages(results))
}

//! Conditional routing after the decision node.

use quill_types::state::ConversationState;

/// Closed set of successors to the decision node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Tools,
    Summarize,
    End,
}

/// Pure routing function evaluated after each decision-node invocation.
///
/// Pending tool calls win over the summarization threshold: tool results
/// must fold back before the history may be compacted.
pub fn route_after_decision(state: &ConversationState, max_messages: usize) -> Next {
    if state.last_assistant().is_some_and(|m| m.has_tool_calls()) {
        Next::Tools
    } else if state.messages.len() > max_messages {
        Next::Summarize
    } else {
        Next::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_types::message::{ChatMessage, ToolCall};
    use quill_types::state::StateUpdate;

    fn tool_call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "web_search".to_string(),
            arguments: serde_json::json!({"query": "rust"}),
        }
    }

    fn state_with(messages: Vec<ChatMessage>) -> ConversationState {
        let mut state = ConversationState::default();
        state.apply(StateUpdate::append_messages(messages));
        state
    }

    #[test]
    fn test_tool_calls_route_to_tools() {
        let state = state_with(vec![
            ChatMessage::user("when is rustconf?"),
            ChatMessage::assistant_with_tools("", vec![tool_call()]),
        ]);
        assert_eq!(route_after_decision(&state, 30), Next::Tools);
    }

    #[test]
    fn test_tools_win_over_summarize_threshold() {
        let mut messages: Vec<ChatMessage> = (0..40)
            .map(|i| ChatMessage::user(format!("msg {i}")))
            .collect();
        messages.push(ChatMessage::assistant_with_tools("", vec![tool_call()]));
        let state = state_with(messages);

        assert_eq!(route_after_decision(&state, 30), Next::Tools);
    }

    #[test]
    fn test_long_history_routes_to_summarize() {
        let mut messages: Vec<ChatMessage> = (0..40)
            .map(|i| ChatMessage::user(format!("msg {i}")))
            .collect();
        messages.push(ChatMessage::assistant("done"));
        let state = state_with(messages);

        assert_eq!(route_after_decision(&state, 30), Next::Summarize);
    }

    #[test]
    fn test_threshold_is_strictly_greater_than() {
        let messages: Vec<ChatMessage> =
            (0..30).map(|i| ChatMessage::assistant(format!("{i}"))).collect();
        let state = state_with(messages);
        assert_eq!(route_after_decision(&state, 30), Next::End);
    }

    #[test]
    fn test_plain_answer_routes_to_end() {
        let state = state_with(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);
        assert_eq!(route_after_decision(&state, 30), Next::End);
    }
}

//! Summarization node.
//!
//! Compacts the history into the rolling summary, keeping only the most
//! recent messages in the log. The update carries the new digest plus
//! removal tombstones; the reducer does the actual deletion, so a replayed
//! update stays consistent.

use quill_types::llm::{CompletionRequest, LlmError, WireMessage};
use quill_types::state::{ConversationState, MessageOp, StateUpdate};

use crate::graph::prompts;
use crate::llm::box_provider::BoxLlmProvider;

/// Messages left in the log after compaction.
pub const KEEP_RECENT: usize = 2;

const SUMMARY_MAX_TOKENS: u32 = 1024;

#[tracing::instrument(
    name = "summarize",
    skip_all,
    fields(message_count = state.messages.len())
)]
pub async fn run(
    provider: &BoxLlmProvider,
    model: &str,
    state: &ConversationState,
) -> Result<StateUpdate, LlmError> {
    let mut transcript = String::new();
    for msg in &state.messages {
        if !msg.content.is_empty() {
            transcript.push_str(&format!("{}: {}\n", msg.role, msg.content));
        }
    }

    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![WireMessage::user(transcript)],
        system: Some(prompts::summary_instruction(&state.summary)),
        max_tokens: SUMMARY_MAX_TOKENS,
        temperature: Some(0.0),
        tools: Vec::new(),
        stream: false,
    };
    let response = provider.complete(&request).await?;
    let summary = response.content.trim().to_string();
    // A blank digest must not overwrite a real one; let the caller degrade
    if summary.is_empty() {
        return Err(LlmError::Provider(
            "summarization returned an empty completion".to_string(),
        ));
    }

    let cutoff = state.messages.len().saturating_sub(KEEP_RECENT);
    let tombstones = state.messages[..cutoff]
        .iter()
        .map(|m| MessageOp::Remove { id: m.id })
        .collect();

    Ok(StateUpdate {
        summary: Some(summary),
        messages: tombstones,
        ..StateUpdate::default()
    })
}

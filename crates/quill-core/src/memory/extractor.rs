//! Post-turn extraction of durable user facts via LLM.
//!
//! `MemoryExtractor` inspects the rolling summary and recent messages for
//! facts worth keeping across conversations (identity, preferences, goals,
//! recurring tools) and merges them into the user's namespaced record.
//! Extraction is best-effort: parse failures log a warning and leave the
//! record untouched, and the merge policy never erases existing facts
//! absent an explicit contradiction.

use serde_json::Value;

use quill_types::llm::{CompletionRequest, LlmError, WireMessage};
use quill_types::message::{ChatMessage, ChatRole};

use crate::llm::box_provider::BoxLlmProvider;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract durable facts about the user from a conversation: identity, preferences, goals, and tools they regularly use.

Rules:
1. Extract ONLY facts worth remembering across conversations.
2. Ignore the subject matter of the conversation itself; only the user matters.
3. Return a single JSON object. Use string fields for scalar facts (e.g. "name", "role"), and array-of-string fields for collections (e.g. "goals", "preferences", "tools").
4. If there is nothing worth extracting, return an empty object: {}

Example output:
{"name": "Alex", "role": "data engineer", "preferences": ["concise answers"], "tools": ["postgres"]}"#;

/// How many trailing messages are offered to the extraction call.
const RECENT_MESSAGES: usize = 6;

/// Stateless utility for extracting long-term user facts.
pub struct MemoryExtractor;

impl MemoryExtractor {
    /// Extract a fact payload from the summary and recent messages.
    ///
    /// Returns `Ok(None)` when the model found nothing (or returned
    /// unparseable output); only a transport-level failure is an `Err`.
    #[tracing::instrument(
        name = "extract_memory",
        skip(provider, summary, messages),
        fields(message_count = messages.len())
    )]
    pub async fn extract(
        provider: &BoxLlmProvider,
        model: &str,
        summary: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<Value>, LlmError> {
        if summary.is_empty() && messages.is_empty() {
            return Ok(None);
        }

        let mut context = String::new();
        if !summary.is_empty() {
            context.push_str("Conversation summary:\n");
            context.push_str(summary);
            context.push_str("\n\n");
        }
        context.push_str("Recent messages:\n");
        for msg in messages.iter().rev().take(RECENT_MESSAGES).rev() {
            if matches!(msg.role, ChatRole::User | ChatRole::Assistant) && !msg.content.is_empty()
            {
                context.push_str(&format!("{}: {}\n", msg.role, msg.content));
            }
        }

        let request = CompletionRequest {
            model: model.to_string(),
            messages: vec![WireMessage::user(context)],
            system: Some(EXTRACTION_SYSTEM_PROMPT.to_string()),
            max_tokens: 1024,
            temperature: Some(0.0),
            tools: Vec::new(),
            stream: false,
        };

        let response = provider.complete(&request).await?;
        let raw = response.content.trim();

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) if !map.is_empty() => Ok(Some(Value::Object(map))),
            Ok(_) => Ok(None),
            Err(e) => {
                let preview: String = raw.chars().take(200).collect();
                tracing::warn!(
                    error = %e,
                    content_preview = %preview,
                    "failed to parse memory extraction JSON; leaving record untouched"
                );
                Ok(None)
            }
        }
    }
}

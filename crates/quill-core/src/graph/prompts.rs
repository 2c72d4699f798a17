//! Prompt construction for the decision and summarization nodes.

use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "You are Quill, a helpful research assistant. Answer the user's questions directly and accurately.

You have tools available. Use the web search tool when the question needs current or factual information you are not certain about; use the date/time tool when asked about today's date, time, or weekday. Do not invoke tools for questions you can answer reliably yourself.

When you used search results, ground your answer in them and keep it concise.";

/// System prompt with the user's long-term memory record appended.
pub fn system_with_memory(memory: Option<&Value>) -> String {
    match memory {
        Some(record) if record.as_object().is_some_and(|m| !m.is_empty()) => {
            format!("{SYSTEM_PROMPT}\n\nWhat you remember about this user:\n{record}")
        }
        _ => SYSTEM_PROMPT.to_string(),
    }
}

const FRESH_SUMMARY_INSTRUCTION: &str = "Summarize the conversation below. Capture the topics discussed, concrete technical details, decisions made, and open threads. Do not include personal facts about the user; those are tracked separately. Keep the summary between 300 and 600 words, or shorter if the conversation is brief. Return only the summary text.";

/// Instruction for the summarization call, extending a prior digest when one
/// exists.
pub fn summary_instruction(existing_summary: &str) -> String {
    if existing_summary.is_empty() {
        FRESH_SUMMARY_INSTRUCTION.to_string()
    } else {
        format!(
            "Here is the summary of the conversation so far:\n\n{existing_summary}\n\nExtend this summary with the new messages below, keeping the combined result between 300 and 600 words. Preserve earlier topics, decisions, and open threads; never drop them. Do not include personal facts about the user. Return only the updated summary text."
        )
    }
}

//! OpenAI SSE stream to [`LlmStreamEvent`] adapter.
//!
//! Tool call arguments arrive as partial JSON fragments across multiple
//! streaming chunks (keyed by tool call index). These are accumulated and
//! emitted as [`LlmStreamEvent::ToolCallComplete`] when a finish_reason
//! arrives.

use std::collections::HashMap;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use async_openai::types::chat::{ChatCompletionResponseStream, FinishReason};

use quill_types::llm::{LlmError, LlmStreamEvent};
use quill_types::message::ToolCall;

/// Accumulates partial JSON fragments for a tool call during streaming.
struct ToolCallAccumulator {
    id: String,
    name: String,
    json_buffer: String,
}

/// Map an async-openai [`ChatCompletionResponseStream`] to provider-agnostic
/// events: `TextDelta` per content chunk, `ToolCallComplete` once each
/// call's JSON is fully assembled, then `Done`.
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> Pin<Box<dyn Stream<Item = Result<LlmStreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let mut tool_accumulators: HashMap<u32, ToolCallAccumulator> = HashMap::new();
        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.clone() {
                    if !text.is_empty() {
                        yield LlmStreamEvent::TextDelta { text };
                    }
                }

                // Tool call deltas: accumulate fragments by index.
                if let Some(tool_calls) = &choice.delta.tool_calls {
                    for tc in tool_calls {
                        let tc_id = tc.id.clone().unwrap_or_default();
                        let tc_name = tc
                            .function
                            .as_ref()
                            .and_then(|f| f.name.clone())
                            .unwrap_or_default();

                        let acc = tool_accumulators
                            .entry(tc.index)
                            .or_insert_with(|| ToolCallAccumulator {
                                id: tc_id.clone(),
                                name: tc_name.clone(),
                                json_buffer: String::new(),
                            });

                        // First chunk for an index carries id and name.
                        if !tc_id.is_empty() {
                            acc.id = tc_id;
                        }
                        if !tc_name.is_empty() {
                            acc.name = tc_name;
                        }
                        if let Some(args) = tc.function.as_ref().and_then(|f| f.arguments.clone()) {
                            acc.json_buffer.push_str(&args);
                        }
                    }
                }

                if let Some(finish_reason) = choice.finish_reason {
                    if matches!(finish_reason, FinishReason::ToolCalls) {
                        let mut indices: Vec<u32> = tool_accumulators.keys().copied().collect();
                        indices.sort();
                        for idx in indices {
                            if let Some(acc) = tool_accumulators.remove(&idx) {
                                let arguments: serde_json::Value = if acc.json_buffer.is_empty() {
                                    serde_json::Value::Object(Default::default())
                                } else {
                                    serde_json::from_str(&acc.json_buffer).map_err(|e| {
                                        LlmError::Deserialization(format!(
                                            "tool call JSON for '{}': {e}",
                                            acc.name
                                        ))
                                    })?
                                };
                                yield LlmStreamEvent::ToolCallComplete(ToolCall {
                                    id: acc.id,
                                    name: acc.name,
                                    arguments,
                                });
                            }
                        }
                    }
                }
            }
        }

        yield LlmStreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_fragments_parse_when_joined() {
        let mut acc = ToolCallAccumulator {
            id: "call_abc".to_string(),
            name: "web_search".to_string(),
            json_buffer: String::new(),
        };

        acc.json_buffer.push_str("{\"query\":");
        acc.json_buffer.push_str(" \"rust async\"}");

        let value: serde_json::Value = serde_json::from_str(&acc.json_buffer).unwrap();
        assert_eq!(value["query"], "rust async");
    }

    #[test]
    fn test_empty_buffer_parses_to_empty_object() {
        let acc = ToolCallAccumulator {
            id: "call_abc".to_string(),
            name: "date_time".to_string(),
            json_buffer: String::new(),
        };

        let input = if acc.json_buffer.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&acc.json_buffer).unwrap()
        };

        assert!(input.is_object());
        assert_eq!(input.as_object().unwrap().len(), 0);
    }

    #[test]
    fn test_interleaved_accumulators_stay_separate() {
        let mut accumulators: HashMap<u32, ToolCallAccumulator> = HashMap::new();

        accumulators.insert(
            0,
            ToolCallAccumulator {
                id: "call_0".to_string(),
                name: "web_search".to_string(),
                json_buffer: String::new(),
            },
        );
        accumulators.insert(
            1,
            ToolCallAccumulator {
                id: "call_1".to_string(),
                name: "date_time".to_string(),
                json_buffer: String::new(),
            },
        );

        accumulators.get_mut(&0).unwrap().json_buffer.push_str("{\"query\":");
        accumulators.get_mut(&1).unwrap().json_buffer.push_str("{}");
        accumulators.get_mut(&0).unwrap().json_buffer.push_str(" \"rust\"}");

        let acc0 = accumulators.remove(&0).unwrap();
        let val0: serde_json::Value = serde_json::from_str(&acc0.json_buffer).unwrap();
        assert_eq!(val0["query"], "rust");

        let acc1 = accumulators.remove(&1).unwrap();
        let val1: serde_json::Value = serde_json::from_str(&acc1.json_buffer).unwrap();
        assert!(val1.as_object().unwrap().is_empty());
    }
}

//! OpenAI-compatible LLM provider.
//!
//! A single [`OpenAiCompatProvider`] serves any backend speaking the OpenAI
//! chat-completions wire shape via a configurable base URL. Uses
//! [`async_openai`] for type-safe request/response handling and built-in
//! SSE streaming; tool schemas from the registry are bound onto each
//! request.

pub mod streaming;

use std::pin::Pin;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestToolMessage,
    ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionTool, ChatCompletionTools,
    CreateChatCompletionRequest, FunctionCall, FunctionObject,
};
use async_openai::Client;
use futures_util::Stream;

use quill_core::llm::provider::LlmProvider;
use quill_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, LlmStreamEvent, WireRole,
};
use quill_types::message::ToolCall;

use self::streaming::map_openai_stream;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the API key lives inside the `async_openai`
/// client and must not reach logs.
pub struct OpenAiCompatProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
}

impl OpenAiCompatProvider {
    pub fn new(provider_name: impl Into<String>, api_key: &str, base_url: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            client: Client::with_config(config),
            provider_name: provider_name.into(),
        }
    }

    /// Provider against the hosted OpenAI endpoint.
    pub fn openai(api_key: &str) -> Self {
        Self::new("openai", api_key, OPENAI_BASE_URL)
    }

    /// Build a [`CreateChatCompletionRequest`] from the generic request.
    fn build_request(
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        for msg in &request.messages {
            messages.push(map_wire_message(msg)?);
        }

        let mut req = CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if !request.tools.is_empty() {
            req.tools = Some(
                request
                    .tools
                    .iter()
                    .map(|t| {
                        ChatCompletionTools::Function(ChatCompletionTool {
                            function: FunctionObject {
                                name: t.name.clone(),
                                description: Some(t.description.clone()),
                                parameters: Some(t.parameters.clone()),
                                strict: None,
                            },
                        })
                    })
                    .collect(),
            );
        }

        if stream {
            req.stream = Some(true);
        }

        Ok(req)
    }
}

fn map_wire_message(
    msg: &quill_types::llm::WireMessage,
) -> Result<ChatCompletionRequestMessage, LlmError> {
    let mapped = match msg.role {
        WireRole::System => {
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                name: None,
            })
        }
        WireRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        WireRole::Assistant => {
            let tool_calls = if msg.tool_calls.is_empty() {
                None
            } else {
                Some(
                    msg.tool_calls
                        .iter()
                        .map(|call| {
                            ChatCompletionMessageToolCalls::Function(
                                ChatCompletionMessageToolCall {
                                    id: call.id.clone(),
                                    function: FunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.arguments.to_string(),
                                    },
                                },
                            )
                        })
                        .collect(),
                )
            };
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: if msg.content.is_empty() {
                    None
                } else {
                    Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    ))
                },
                refusal: None,
                name: None,
                audio: None,
                tool_calls,
                function_call: None,
            })
        }
        WireRole::Tool => {
            let tool_call_id = msg.tool_call_id.clone().ok_or_else(|| {
                LlmError::InvalidRequest("tool message missing tool_call_id".to_string())
            })?;
            ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id,
            })
        }
    };
    Ok(mapped)
}

impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = Self::build_request(request, false)?;

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let choice = response.choices.into_iter().next();
        let content = choice
            .as_ref()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let tool_calls = choice
            .and_then(|c| c.message.tool_calls)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(call) => Some(call),
                // Custom tool calls are never requested, so never expected back
                ChatCompletionMessageToolCalls::Custom(_) => None,
            })
            .map(|call| {
                let arguments = if call.function.arguments.is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        LlmError::Deserialization(format!(
                            "tool call JSON for '{}': {e}",
                            call.function.name
                        ))
                    })?
                };
                Ok(ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        Ok(CompletionResponse {
            content,
            tool_calls,
            model: response.model,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<LlmStreamEvent, LlmError>> + Send + 'static>> {
        let oai_request = match Self::build_request(&request, true) {
            Ok(req) => req,
            Err(e) => {
                return Box::pin(futures_util::stream::once(async move { Err(e) }));
            }
        };

        // Clone the client for the 'static stream closure
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(event) = inner.next().await {
                match event {
                    Ok(ev) => yield ev,
                    Err(e) => Err(e)?,
                }
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited
            } else if error_type == "invalid_request_error" {
                LlmError::InvalidRequest(api_err.message.clone())
            } else {
                LlmError::Provider(err.to_string())
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    401 => LlmError::AuthenticationFailed,
                    429 => LlmError::RateLimited,
                    400 | 422 => LlmError::InvalidRequest(err.to_string()),
                    _ => LlmError::Provider(err.to_string()),
                }
            } else {
                LlmError::Provider(err.to_string())
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider(err.to_string()),
    }
}

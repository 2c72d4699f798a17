//! Tavily-backed web search tool.
//!
//! Sends the model-supplied query to the Tavily API and folds up to three
//! ranked results into a single formatted block (title, truncated content,
//! URL). Zero results is a valid outcome, not an error. The request carries
//! a hard timeout so a stuck backend cannot hold an admission slot.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use quill_core::tool::{Tool, ToolOutput, SEARCH_TOOL};
use quill_types::error::ToolError;
use quill_types::llm::ToolSpec;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const MAX_RESULTS: usize = 3;
const DEFAULT_CHAR_CAP: usize = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

pub struct TavilySearchTool {
    client: reqwest::Client,
    api_key: String,
    char_cap: usize,
}

impl TavilySearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            char_cap: DEFAULT_CHAR_CAP,
        }
    }

    /// Override the default per-result content cap.
    pub fn with_char_cap(mut self, char_cap: usize) -> Self {
        self.char_cap = char_cap;
        self
    }

    /// Per-result cap for this invocation: the model may pass `max_chars`,
    /// otherwise the configured default applies.
    fn requested_char_cap(&self, arguments: &Value) -> usize {
        arguments
            .get("max_chars")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .filter(|&v| v > 0)
            .unwrap_or(self.char_cap)
    }

    fn backend_err(&self, message: impl std::fmt::Display) -> ToolError {
        ToolError::Backend {
            tool: SEARCH_TOOL.to_string(),
            message: message.to_string(),
        }
    }
}

/// Truncate to at most `cap` bytes without splitting a character.
fn truncate_content(content: &str, cap: usize) -> &str {
    if content.len() <= cap {
        return content;
    }
    let mut end = cap;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn format_results(results: &[SearchResult], char_cap: usize) -> (String, Vec<String>) {
    let mut formatted = String::new();
    let mut urls = Vec::new();
    for result in results.iter().take(MAX_RESULTS) {
        formatted.push_str(&format!(
            "Title: {}\n{}\nURL: {}\n\n",
            result.title,
            truncate_content(&result.content, char_cap),
            result.url
        ));
        if !result.url.is_empty() {
            urls.push(result.url.clone());
        }
    }
    (formatted.trim_end().to_string(), urls)
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: SEARCH_TOOL.to_string(),
            description: "Search the web for current or factual information. Returns up to three ranked results with titles, snippets, and source URLs.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text search query"
                    },
                    "max_chars": {
                        "type": "integer",
                        "description": "Maximum characters of content per result (default 500)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    #[tracing::instrument(name = "web_search", skip(self, arguments))]
    async fn invoke(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(|q| q.as_str())
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: SEARCH_TOOL.to_string(),
                message: "missing required string argument 'query'".to_string(),
            })?;

        tracing::debug!(query, "searching");

        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .timeout(REQUEST_TIMEOUT)
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results: MAX_RESULTS,
            })
            .send()
            .await
            .map_err(|e| self.backend_err(e))?;

        if !response.status().is_success() {
            return Err(self.backend_err(format!("search API returned {}", response.status())));
        }

        let body: SearchResponse = response.json().await.map_err(|e| self.backend_err(e))?;
        let (content, urls) = format_results(&body.results, self.requested_char_cap(arguments));

        Ok(ToolOutput {
            content,
            urls,
            display: None,
        })
    }
}

//! Environment-based settings.
//!
//! Everything has a sensible default except the API keys, which stay empty
//! when unset; the binary validates them at startup. Keys are never logged.

use crate::sqlite::default_database_url;

#[derive(Clone)]
pub struct Settings {
    /// Key for the OpenAI-compatible provider.
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    /// Key for the Tavily search backend.
    pub tavily_api_key: String,
    /// Summarization threshold; history is compacted above this length.
    pub max_messages: usize,
    pub max_concurrent_streams: usize,
    pub database_url: String,
    pub bind_addr: String,
    /// Identity used for long-term memory until real accounts exist.
    pub user_id: String,
}

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_MESSAGES: usize = 30;
const DEFAULT_MAX_CONCURRENT_STREAMS: usize = 8;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_USER_ID: &str = "default-user";

impl Settings {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openai_base_url: env_or(
                "OPENAI_BASE_URL",
                crate::llm::openai_compat::OPENAI_BASE_URL,
            ),
            model: env_or("QUILL_MODEL", DEFAULT_MODEL),
            tavily_api_key: env_or("TAVILY_API_KEY", ""),
            max_messages: env_parsed("QUILL_MAX_MESSAGES", DEFAULT_MAX_MESSAGES),
            max_concurrent_streams: env_parsed(
                "QUILL_MAX_CONCURRENT_STREAMS",
                DEFAULT_MAX_CONCURRENT_STREAMS,
            ),
            database_url: env_or("QUILL_DATABASE_URL", &default_database_url()),
            bind_addr: env_or("QUILL_BIND_ADDR", DEFAULT_BIND_ADDR),
            user_id: env_or("QUILL_USER_ID", DEFAULT_USER_ID),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

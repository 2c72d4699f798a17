//! Application state wiring all services together.
//!
//! AppState holds the graph manager, the admission limiter, and the
//! settings snapshot. The graph itself is built lazily by the manager via
//! `QuillGraphFactory`, which pins the graph seams to the concrete infra
//! implementations (SQLite stores, OpenAI-compatible provider, Tavily).

use std::sync::Arc;

use async_trait::async_trait;

use quill_core::admission::{FallbackLimiter, LocalStreamLimiter, StreamLimiter};
use quill_core::graph::{ConversationGraph, GraphConfig, RetryPolicy};
use quill_core::llm::box_provider::BoxLlmProvider;
use quill_core::manager::{GraphFactory, GraphManager};
use quill_core::tool::{datetime::DateTimeTool, ToolRegistry};
use quill_infra::config::Settings;
use quill_infra::llm::OpenAiCompatProvider;
use quill_infra::search::TavilySearchTool;
use quill_infra::sqlite::{DatabasePool, SqliteCheckpointer, SqliteMemoryStore};
use quill_types::error::{CheckpointError, GraphError};

/// Shared application state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<GraphManager>,
    pub limiter: Arc<dyn StreamLimiter>,
    pub settings: Settings,
}

impl AppState {
    /// Validate settings and wire the manager and limiter.
    ///
    /// The database and provider clients are not touched here; the factory
    /// builds them on the first request.
    pub fn init(settings: Settings) -> anyhow::Result<Self> {
        if settings.openai_api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY must be set");
        }

        let limiter = Arc::new(FallbackLimiter::new(
            None,
            LocalStreamLimiter::new(settings.max_concurrent_streams),
        ));
        let manager = Arc::new(GraphManager::new(Box::new(QuillGraphFactory {
            settings: settings.clone(),
        })));

        Ok(Self {
            manager,
            limiter,
            settings,
        })
    }
}

/// Builds the conversation graph against SQLite storage and the configured
/// LLM and search backends.
pub struct QuillGraphFactory {
    settings: Settings,
}

#[async_trait]
impl GraphFactory for QuillGraphFactory {
    async fn build(&self) -> Result<ConversationGraph, GraphError> {
        ensure_data_dir(&self.settings.database_url).await;

        let pool = DatabasePool::new(&self.settings.database_url)
            .await
            .map_err(|e| GraphError::Checkpoint(CheckpointError::Storage(e.to_string())))?;

        let checkpointer = Arc::new(SqliteCheckpointer::new(pool.clone()));
        let memory = Arc::new(SqliteMemoryStore::new(pool));

        let provider = BoxLlmProvider::new(OpenAiCompatProvider::new(
            "openai",
            &self.settings.openai_api_key,
            &self.settings.openai_base_url,
        ));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DateTimeTool::default()));
        if self.settings.tavily_api_key.is_empty() {
            tracing::warn!("TAVILY_API_KEY not set, web search tool disabled");
        } else {
            registry.register(Arc::new(TavilySearchTool::new(
                self.settings.tavily_api_key.clone(),
            )));
        }

        Ok(ConversationGraph::new(
            provider,
            registry,
            checkpointer,
            memory,
            RetryPolicy::default(),
            GraphConfig {
                model: self.settings.model.clone(),
                max_messages: self.settings.max_messages,
            },
        ))
    }
}

/// Create the parent directory for a file-backed sqlite URL so the pool's
/// `create_if_missing` has somewhere to put the file. Best effort.
async fn ensure_data_dir(database_url: &str) {
    if let Some(path) = database_url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %e, dir = %parent.display(), "could not create data directory");
            }
        }
    }
}

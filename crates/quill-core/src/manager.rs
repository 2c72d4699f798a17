//! Process-wide graph lifecycle.
//!
//! The graph and its checkpointer are expensive to build and must exist at
//! most once per process. `GraphManager` constructs them lazily under a
//! `OnceCell` so concurrent first requests cannot double-construct, and
//! tears them down exactly once at shutdown. After shutdown the manager
//! refuses further use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use quill_types::error::{CheckpointError, GraphError};

use crate::graph::ConversationGraph;

/// Builds the compiled graph with its backing stores.
#[async_trait]
pub trait GraphFactory: Send + Sync {
    async fn build(&self) -> Result<ConversationGraph, GraphError>;
}

pub struct GraphManager {
    factory: Box<dyn GraphFactory>,
    graph: OnceCell<Arc<ConversationGraph>>,
    shut_down: AtomicBool,
}

impl GraphManager {
    pub fn new(factory: Box<dyn GraphFactory>) -> Self {
        Self {
            factory,
            graph: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// The shared graph, built and initialized on first use.
    pub async fn graph(&self) -> Result<Arc<ConversationGraph>, GraphError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(GraphError::Checkpoint(CheckpointError::Storage(
                "graph manager is shut down".to_string(),
            )));
        }
        self.graph
            .get_or_try_init(|| async {
                tracing::info!("building conversation graph");
                let graph = self.factory.build().await?;
                graph.setup().await?;
                Ok(Arc::new(graph))
            })
            .await
            .cloned()
    }

    /// Tear down the graph and its checkpointer. Idempotent.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(graph) = self.graph.get() {
            tracing::info!("closing conversation graph");
            graph.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use crate::checkpoint::MemoryCheckpointer;
    use crate::graph::{GraphConfig, RetryPolicy};
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::llm::mock::MockProvider;
    use crate::memory::InMemoryStore;
    use crate::tool::ToolRegistry;

    struct CountingFactory {
        builds: Arc<AtomicU32>,
    }

    #[async_trait]
    impl GraphFactory for CountingFactory {
        async fn build(&self) -> Result<ConversationGraph, GraphError> {
            // Window where a racing second build would be observable.
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(ConversationGraph::new(
                BoxLlmProvider::new(MockProvider::new(vec![])),
                ToolRegistry::new(),
                Arc::new(MemoryCheckpointer::new()),
                Arc::new(InMemoryStore::new()),
                RetryPolicy::default(),
                GraphConfig {
                    model: "mock-model".to_string(),
                    max_messages: 30,
                },
            ))
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicU32::new(0));
        let manager = Arc::new(GraphManager::new(Box::new(CountingFactory {
            builds: Arc::clone(&builds),
        })));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&manager);
                tokio::spawn(async move { m.graph().await.map(|_| ()) })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_final() {
        let builds = Arc::new(AtomicU32::new(0));
        let manager = GraphManager::new(Box::new(CountingFactory {
            builds: Arc::clone(&builds),
        }));

        manager.graph().await.unwrap();
        manager.shutdown().await;
        manager.shutdown().await;

        assert!(manager.graph().await.is_err());
    }
}

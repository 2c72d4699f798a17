//! Graph engine: drives nodes, applies updates, checkpoints, routes.
//!
//! `run` spawns a detached task so a disconnected consumer never aborts the
//! run; state mutation and checkpoint writes always complete. Exactly one
//! terminal event (`Completed` or `Failed`) closes the channel.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use quill_types::error::{CheckpointError, GraphError};
use quill_types::state::ConversationState;

use crate::checkpoint::{Checkpoint, Checkpointer};
use crate::graph::event::{EventSink, GraphEvent};
use crate::graph::nodes;
use crate::graph::retry::RetryPolicy;
use crate::graph::routing::{route_after_decision, Next};
use crate::graph::{NODE_LLM_CALL, NODE_SUMMARIZE, NODE_TOOLS};
use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::{merge_memory, MemoryExtractor, MemoryStore, MEMORY_NAMESPACE, USER_DETAILS_KEY};
use crate::tool::ToolRegistry;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Decision/tool hops allowed within one turn before the run is aborted.
/// Guards against a model that keeps requesting tools forever.
const MAX_TURN_HOPS: usize = 25;

/// Tunables for one compiled graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub model: String,
    /// Summarization threshold: compact when `messages.len()` exceeds this.
    pub max_messages: usize,
}

/// A compiled conversation graph.
///
/// Owns its checkpointer and memory store for its lifetime; `close` is the
/// only teardown path and is driven by the graph manager.
pub struct ConversationGraph {
    provider: BoxLlmProvider,
    registry: ToolRegistry,
    checkpointer: Arc<dyn Checkpointer>,
    memory: Arc<dyn MemoryStore>,
    retry: RetryPolicy,
    config: GraphConfig,
}

impl ConversationGraph {
    pub fn new(
        provider: BoxLlmProvider,
        registry: ToolRegistry,
        checkpointer: Arc<dyn Checkpointer>,
        memory: Arc<dyn MemoryStore>,
        retry: RetryPolicy,
        config: GraphConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            checkpointer,
            memory,
            retry,
            config,
        }
    }

    /// Initialize the backing stores. Idempotent.
    pub async fn setup(&self) -> Result<(), GraphError> {
        self.checkpointer.setup().await?;
        self.memory
            .setup()
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Latest durable snapshot for a conversation.
    pub async fn get_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Checkpoint>, CheckpointError> {
        self.checkpointer.get(conversation_id).await
    }

    /// Release backing resources. Called exactly once at shutdown.
    pub async fn close(&self) {
        self.checkpointer.close().await;
    }

    /// Start one turn. The run is detached: dropping the receiver stops
    /// event delivery but the turn, its checkpoints, and memory extraction
    /// run to completion.
    pub fn run(
        self: &Arc<Self>,
        conversation_id: String,
        user_id: String,
        message: String,
    ) -> mpsc::Receiver<GraphEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let graph = Arc::clone(self);
        tokio::spawn(async move {
            let sink = EventSink::new(tx);
            match graph.run_turn(&conversation_id, &user_id, message, &sink).await {
                Ok(state) => {
                    sink.emit(GraphEvent::Completed {
                        state: Box::new(state),
                    })
                    .await;
                }
                Err(e) => {
                    tracing::error!(conversation_id, error = %e, "graph run failed");
                    sink.emit(GraphEvent::Failed {
                        message: e.to_string(),
                    })
                    .await;
                }
            }
        });
        rx
    }

    #[tracing::instrument(name = "graph_turn", skip(self, message, sink))]
    async fn run_turn(
        &self,
        conversation_id: &str,
        user_id: &str,
        message: String,
        sink: &EventSink,
    ) -> Result<ConversationState, GraphError> {
        if message.trim().is_empty() {
            return Err(GraphError::EmptyQuery);
        }

        let mut state = self
            .checkpointer
            .get(conversation_id)
            .await?
            .map(|c| c.state)
            .unwrap_or_default();
        state.query.push(message);

        let memory_record = self.load_memory(user_id).await;
        let specs = self.registry.specs();

        let mut hops = 0;
        loop {
            if hops >= MAX_TURN_HOPS {
                return Err(GraphError::IterationLimit {
                    limit: MAX_TURN_HOPS,
                });
            }
            hops += 1;

            let update = self
                .retry
                .run(NODE_LLM_CALL, || {
                    nodes::llm_call::run(
                        &self.provider,
                        &self.config.model,
                        &state,
                        &specs,
                        memory_record.as_ref(),
                        sink,
                    )
                })
                .await?;
            state.apply(update);
            self.checkpoint(conversation_id, &state, NODE_LLM_CALL).await?;

            match route_after_decision(&state, self.config.max_messages) {
                Next::Tools => {
                    let update = self
                        .retry
                        .run(NODE_TOOLS, || {
                            nodes::tools::run(&self.registry, &state, sink)
                        })
                        .await?;
                    state.apply(update);
                    self.checkpoint(conversation_id, &state, NODE_TOOLS).await?;
                }
                Next::Summarize => {
                    // Summarization failure degrades: prior summary kept,
                    // nothing removed, the turn still succeeds.
                    match self
                        .retry
                        .run(NODE_SUMMARIZE, || {
                            nodes::summarize::run(&self.provider, &self.config.model, &state)
                        })
                        .await
                    {
                        Ok(update) => state.apply(update),
                        Err(e) => {
                            tracing::warn!(conversation_id, error = %e, "summarization failed, keeping history");
                        }
                    }
                    self.checkpoint(conversation_id, &state, NODE_SUMMARIZE).await?;
                    break;
                }
                Next::End => break,
            }
        }

        self.extract_memory(user_id, &state, memory_record).await;
        Ok(state)
    }

    async fn checkpoint(
        &self,
        conversation_id: &str,
        state: &ConversationState,
        node: &str,
    ) -> Result<(), CheckpointError> {
        self.checkpointer
            .put(&Checkpoint::new(conversation_id, state.clone(), node))
            .await
    }

    async fn load_memory(&self, user_id: &str) -> Option<Value> {
        match self
            .memory
            .get(MEMORY_NAMESPACE, user_id, USER_DETAILS_KEY)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to load user memory");
                None
            }
        }
    }

    /// Best-effort post-turn extraction of durable user facts.
    async fn extract_memory(
        &self,
        user_id: &str,
        state: &ConversationState,
        existing: Option<Value>,
    ) {
        let extracted = match MemoryExtractor::extract(
            &self.provider,
            &self.config.model,
            &state.summary,
            &state.messages,
        )
        .await
        {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "memory extraction failed");
                return;
            }
        };

        let base = existing.unwrap_or_else(|| Value::Object(Default::default()));
        let merged = merge_memory(&base, &extracted);
        if let Err(e) = self
            .memory
            .put(MEMORY_NAMESPACE, user_id, USER_DETAILS_KEY, &merged)
            .await
        {
            tracing::warn!(user_id, error = %e, "failed to persist user memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use quill_types::error::ToolError;
    use quill_types::llm::ToolSpec;
    use quill_types::message::{ChatMessage, ChatRole, ToolCall};
    use quill_types::state::StateUpdate;

    use crate::checkpoint::MemoryCheckpointer;
    use crate::llm::mock::{MockProvider, MockStep};
    use crate::memory::InMemoryStore;
    use crate::tool::{Tool, ToolOutput, SEARCH_TOOL};

    struct FakeSearch;

    #[async_trait]
    impl Tool for FakeSearch {
        fn name(&self) -> &str {
            SEARCH_TOOL
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: SEARCH_TOOL.to_string(),
                description: "search".to_string(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn invoke(&self, _arguments: &Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput {
                content: "RustConf is in September.".to_string(),
                urls: vec!["https://rustconf.com".to_string()],
                display: None,
            })
        }
    }

    fn build_graph(
        steps: Vec<MockStep>,
        checkpointer: Arc<dyn Checkpointer>,
        memory: Arc<dyn MemoryStore>,
        max_messages: usize,
    ) -> Arc<ConversationGraph> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FakeSearch));
        Arc::new(ConversationGraph::new(
            BoxLlmProvider::new(MockProvider::new(steps)),
            registry,
            checkpointer,
            memory,
            RetryPolicy {
                max_attempts: 3,
                initial_interval: Duration::from_millis(1),
            },
            GraphConfig {
                model: "mock-model".to_string(),
                max_messages,
            },
        ))
    }

    async fn drain(mut rx: mpsc::Receiver<GraphEvent>) -> Vec<GraphEvent> {
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        events
    }

    fn final_state(events: &[GraphEvent]) -> &ConversationState {
        match events.last() {
            Some(GraphEvent::Completed { state }) => state,
            other => panic!("expected Completed terminal event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_turn_answers_and_checkpoints() {
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemoryCheckpointer::new());
        let graph = build_graph(
            vec![MockStep::text("four")],
            Arc::clone(&checkpointer),
            Arc::new(InMemoryStore::new()),
            30,
        );
        graph.setup().await.unwrap();

        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "2+2?".to_string());
        let events = drain(rx).await;

        let state = final_state(&events);
        assert_eq!(state.answer, "four");
        assert_eq!(state.runs, 1);
        assert!(state.query.is_empty());

        let cp = checkpointer.get("conv-1").await.unwrap().unwrap();
        assert_eq!(cp.node, NODE_LLM_CALL);
        assert_eq!(cp.state.answer, "four");

        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                GraphEvent::Content { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, "four");
    }

    #[tokio::test]
    async fn test_tool_loop_folds_results_and_answers() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: SEARCH_TOOL.to_string(),
            arguments: json!({"query": "rustconf dates"}),
        };
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemoryCheckpointer::new());
        let graph = build_graph(
            vec![
                MockStep::tool_call(call),
                MockStep::text("It is in September."),
            ],
            Arc::clone(&checkpointer),
            Arc::new(InMemoryStore::new()),
            30,
        );

        let rx = graph.run(
            "conv-1".to_string(),
            "u1".to_string(),
            "when is rustconf?".to_string(),
        );
        let events = drain(rx).await;

        let state = final_state(&events);
        assert_eq!(state.answer, "It is in September.");
        assert_eq!(state.runs, 2);

        // user, assistant(tool call), tool result, assistant answer
        let roles: Vec<ChatRole> = state.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::Tool,
                ChatRole::Assistant
            ]
        );
        assert_eq!(state.messages[2].tool_call_id.as_deref(), Some("call_1"));

        // search_start precedes search_result precedes the final answer text.
        let start_idx = events
            .iter()
            .position(|e| matches!(e, GraphEvent::SearchStart { .. }))
            .unwrap();
        let result_idx = events
            .iter()
            .position(|e| matches!(e, GraphEvent::SearchResult { .. }))
            .unwrap();
        assert!(start_idx < result_idx);
    }

    #[tokio::test]
    async fn test_summarization_bounds_history() {
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemoryCheckpointer::new());
        // Seed a long conversation just under the threshold.
        let mut seeded = ConversationState::default();
        seeded.apply(StateUpdate::append_messages(
            (0..4)
                .flat_map(|i| {
                    vec![
                        ChatMessage::user(format!("q{i}")),
                        ChatMessage::assistant(format!("a{i}")),
                    ]
                })
                .collect(),
        ));
        checkpointer
            .put(&Checkpoint::new("conv-1", seeded, NODE_LLM_CALL))
            .await
            .unwrap();

        let graph = build_graph(
            vec![MockStep::text("answer"), MockStep::text("the digest")],
            Arc::clone(&checkpointer),
            Arc::new(InMemoryStore::new()),
            9,
        );

        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "more".to_string());
        let events = drain(rx).await;

        let state = final_state(&events);
        assert_eq!(state.summary, "the digest");
        assert_eq!(state.messages.len(), 2);
        // Survivors are the two most recent entries.
        assert_eq!(state.messages[0].content, "more");
        assert_eq!(state.messages[1].content, "answer");

        let cp = checkpointer.get("conv-1").await.unwrap().unwrap();
        assert_eq!(cp.node, NODE_SUMMARIZE);
    }

    #[tokio::test]
    async fn test_summarization_failure_degrades_not_fails() {
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemoryCheckpointer::new());
        let mut seeded = ConversationState::default();
        seeded.summary = "prior digest".to_string();
        seeded.apply(StateUpdate::append_messages(
            (0..8).map(|i| ChatMessage::user(format!("m{i}"))).collect(),
        ));
        checkpointer
            .put(&Checkpoint::new("conv-1", seeded, NODE_LLM_CALL))
            .await
            .unwrap();

        // One good answer, then every summarize attempt fails.
        let graph = build_graph(
            vec![
                MockStep::text("answer"),
                MockStep::FailProvider,
                MockStep::FailProvider,
                MockStep::FailProvider,
            ],
            Arc::clone(&checkpointer),
            Arc::new(InMemoryStore::new()),
            5,
        );

        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "more".to_string());
        let events = drain(rx).await;

        let state = final_state(&events);
        assert_eq!(state.summary, "prior digest");
        assert_eq!(state.messages.len(), 10);
        assert!(!events.iter().any(|e| matches!(e, GraphEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_empty_message_fails_without_llm_call() {
        let graph = build_graph(
            vec![],
            Arc::new(MemoryCheckpointer::new()),
            Arc::new(InMemoryStore::new()),
            30,
        );
        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "   ".to_string());
        let events = drain(rx).await;
        match events.last() {
            Some(GraphEvent::Failed { message }) => {
                assert!(message.contains("pending query"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_as_failed() {
        let graph = build_graph(
            vec![
                MockStep::FailProvider,
                MockStep::FailProvider,
                MockStep::FailProvider,
            ],
            Arc::new(MemoryCheckpointer::new()),
            Arc::new(InMemoryStore::new()),
            30,
        );
        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "hi".to_string());
        let events = drain(rx).await;
        match events.last() {
            Some(GraphEvent::Failed { message }) => {
                assert!(message.contains("llm_call"));
                assert!(message.contains("3 attempts"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_endless_tool_requests_hit_the_hop_cap() {
        // A model that asks for a tool on every decision never reaches End.
        let steps = (0..MAX_TURN_HOPS + 5)
            .map(|i| {
                MockStep::tool_call(ToolCall {
                    id: format!("call_{i}"),
                    name: SEARCH_TOOL.to_string(),
                    arguments: json!({"query": "again"}),
                })
            })
            .collect();
        let graph = build_graph(
            steps,
            Arc::new(MemoryCheckpointer::new()),
            Arc::new(InMemoryStore::new()),
            1000,
        );

        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "hi".to_string());
        let events = drain(rx).await;
        match events.last() {
            Some(GraphEvent::Failed { message }) => {
                assert!(message.contains("node transitions"), "got: {message}");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resumption_across_graph_instances() {
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemoryCheckpointer::new());
        let memory: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());

        let first = build_graph(
            vec![MockStep::text("blue")],
            Arc::clone(&checkpointer),
            Arc::clone(&memory),
            30,
        );
        let rx = first.run(
            "conv-1".to_string(),
            "u1".to_string(),
            "favorite color?".to_string(),
        );
        drain(rx).await;

        // New graph instance over the same store resumes the history.
        let second = build_graph(
            vec![MockStep::text("still blue")],
            Arc::clone(&checkpointer),
            memory,
            30,
        );
        let rx = second.run(
            "conv-1".to_string(),
            "u1".to_string(),
            "what did you say?".to_string(),
        );
        let events = drain(rx).await;

        let state = final_state(&events);
        let contents: Vec<&str> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["favorite color?", "blue", "what did you say?", "still blue"]
        );
    }

    #[tokio::test]
    async fn test_memory_extracted_and_merged_after_turn() {
        let memory: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        memory
            .put(
                MEMORY_NAMESPACE,
                "u1",
                USER_DETAILS_KEY,
                &json!({"tools": ["cargo"]}),
            )
            .await
            .unwrap();

        let graph = build_graph(
            vec![
                MockStep::text("nice to meet you, Alex"),
                MockStep::text(r#"{"name": "Alex", "tools": ["git"]}"#),
            ],
            Arc::new(MemoryCheckpointer::new()),
            Arc::clone(&memory),
            30,
        );

        let rx = graph.run(
            "conv-1".to_string(),
            "u1".to_string(),
            "hi, I'm Alex and I use git".to_string(),
        );
        drain(rx).await;

        let record = memory
            .get(MEMORY_NAMESPACE, "u1", USER_DETAILS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["name"], "Alex");
        assert_eq!(record["tools"], json!(["cargo", "git"]));
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_abort_run() {
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemoryCheckpointer::new());
        let graph = build_graph(
            vec![MockStep::text("finished anyway")],
            Arc::clone(&checkpointer),
            Arc::new(InMemoryStore::new()),
            30,
        );

        let rx = graph.run("conv-1".to_string(), "u1".to_string(), "hi".to_string());
        drop(rx);

        // The detached task still writes the checkpoint.
        let mut cp = None;
        for _ in 0..50 {
            cp = checkpointer.get("conv-1").await.unwrap();
            if cp.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cp.unwrap().state.answer, "finished anyway");
    }
}

//! Error enums shared across Quill crates.

use thiserror::Error;

/// Errors from tool invocations.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("backend error from '{tool}': {message}")]
    Backend { tool: String, message: String },
}

/// Errors from checkpoint store operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("checkpoint '{0}' not found")]
    NotFound(String),
}

/// Errors from long-term memory store operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by a graph run.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node '{node}' failed after {attempts} attempts: {message}")]
    NodeFailed {
        node: String,
        attempts: u32,
        message: String,
    },

    #[error("decision node requires at least one pending query message")]
    EmptyQuery,

    #[error("turn exceeded {limit} node transitions without completing")]
    IterationLimit { limit: usize },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Admission-control rejections, kept distinct from generic failures.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("too many concurrent streams (max {max})")]
    TooManyStreams { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_display() {
        let err = ToolError::UnknownTool("frobnicate".to_string());
        assert_eq!(err.to_string(), "unknown tool: 'frobnicate'");
    }

    #[test]
    fn test_node_failed_display() {
        let err = GraphError::NodeFailed {
            node: "llm_call".to_string(),
            attempts: 3,
            message: "timeout".to_string(),
        };
        assert!(err.to_string().contains("llm_call"));
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_admission_error_display() {
        let err = AdmissionError::TooManyStreams { max: 8 };
        assert_eq!(err.to_string(), "too many concurrent streams (max 8)");
    }

    #[test]
    fn test_checkpoint_error_into_graph_error() {
        let err: GraphError = CheckpointError::NotFound("conv-9".to_string()).into();
        assert!(err.to_string().contains("conv-9"));
    }
}

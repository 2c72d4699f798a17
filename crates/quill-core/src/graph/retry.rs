//! Per-node retry with fixed backoff.

use std::future::Future;
use std::time::Duration;

use quill_types::error::GraphError;

/// Retry configuration applied independently to each node invocation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or `max_attempts` is exhausted.
    ///
    /// Exhaustion escalates to [`GraphError::NodeFailed`] carrying the node
    /// name, attempt count, and the final error.
    pub async fn run<T, E, F, Fut>(&self, node: &str, mut op: F) -> Result<T, GraphError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(node, attempt, error = %e, "node attempt failed, retrying");
                    tokio::time::sleep(self.initial_interval).await;
                }
                Err(e) => {
                    return Err(GraphError::NodeFailed {
                        node: node.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

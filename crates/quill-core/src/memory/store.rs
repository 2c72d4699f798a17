//! Memory store contract and the volatile in-process backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use quill_types::error::MemoryError;

/// Namespace under which per-user memory records are stored.
pub const MEMORY_NAMESPACE: &str = "memory";
/// Key of the durable user-facts record within a user's namespace.
pub const USER_DETAILS_KEY: &str = "user_details";

/// Namespaced keyed store for durable user facts.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Idempotent schema/connection initialization.
    async fn setup(&self) -> Result<(), MemoryError>;

    async fn get(
        &self,
        namespace: &str,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Value>, MemoryError>;

    async fn put(
        &self,
        namespace: &str,
        user_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<(), MemoryError>;
}

/// In-memory store keyed by `(namespace, user_id, key)`. Tests/dev only.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<(String, String, String), Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn setup(&self) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn get(
        &self,
        namespace: &str,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Value>, MemoryError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(
                namespace.to_string(),
                user_id.to_string(),
                key.to_string(),
            ))
            .cloned())
    }

    async fn put(
        &self,
        namespace: &str,
        user_id: &str,
        key: &str,
        value: &Value,
    ) -> Result<(), MemoryError> {
        self.records.write().await.insert(
            (
                namespace.to_string(),
                user_id.to_string(),
                key.to_string(),
            ),
            value.clone(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_scoped_by_user() {
        let store = InMemoryStore::new();
        store.setup().await.unwrap();
        store
            .put(MEMORY_NAMESPACE, "alice", USER_DETAILS_KEY, &json!({"name": "Alice"}))
            .await
            .unwrap();

        let found = store
            .get(MEMORY_NAMESPACE, "alice", USER_DETAILS_KEY)
            .await
            .unwrap();
        assert_eq!(found, Some(json!({"name": "Alice"})));

        let missing = store
            .get(MEMORY_NAMESPACE, "bob", USER_DETAILS_KEY)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}

//! Long-term memory: durable, user-scoped facts independent of checkpoints.
//!
//! Records live under `(namespace="memory", user_id)` → `"user_details"` and
//! have their own lifecycle: created on first successful extraction, updated
//! by merge, never deleted by conversation completion.

pub mod extractor;
pub mod merge;
pub mod store;

pub use extractor::MemoryExtractor;
pub use merge::merge_memory;
pub use store::{InMemoryStore, MemoryStore, MEMORY_NAMESPACE, USER_DETAILS_KEY};

//! SQLite persistence: split-pool plumbing plus the durable checkpoint and
//! memory stores.

pub mod checkpoint;
pub mod memory;
pub mod pool;

pub use checkpoint::SqliteCheckpointer;
pub use memory::SqliteMemoryStore;
pub use pool::{default_database_url, DatabasePool};

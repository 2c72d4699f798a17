//! External event stream for one turn.

pub mod bridge;

pub use bridge::{StreamingBridge, TurnRequest};

//! Network-backed tools.

pub mod tavily;

pub use tavily::TavilySearchTool;

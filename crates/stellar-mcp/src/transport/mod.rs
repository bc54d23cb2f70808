//! MCP Transport implementations

pub mod stdio;

pub use stdio::*;

//! MCP Protocol implementation
//!
//! JSON-RPC framing, capability negotiation and the tool/resource message
//! types this server speaks.

pub mod capabilities;
pub mod jsonrpc;
pub mod lifecycle;
pub mod messages;

pub use capabilities::*;
pub use jsonrpc::*;
pub use lifecycle::*;
pub use messages::*;

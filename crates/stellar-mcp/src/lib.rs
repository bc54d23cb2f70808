//! Stellar MCP Server
//!
//! A Model Context Protocol (MCP) server that lets an AI agent create and
//! fund Stellar accounts, inspect their history and sign-and-submit Soroban
//! contract calls, either as a classic account or through a passkey smart
//! wallet.
//!
//! # Tools
//!
//! - `create-account`, `fund-account`, `get-account`, `get-transactions`
//! - `sign-and-submit-transaction`
//!
//! # Resources
//!
//! Optional agent keypair, usage guide and SAC guide files, each listed only
//! when its path is configured.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use stellar_mcp::McpServer;
//! use stellar_mcp_core::Config;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = McpServer::new(Arc::new(Config::from_env()));
//!     server.run_stdio().await
//! }
//! ```

pub mod handlers;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ServerInfo, Tool,
    ToolContent, ToolsCallResult, MCP_PROTOCOL_VERSION,
};
pub use server::McpServer;
pub use tools::ToolContext;
pub use transport::{LineTransport, StdioTransport};

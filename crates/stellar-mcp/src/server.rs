//! MCP Server implementation

use std::sync::Arc;

use stellar_mcp_core::Config;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::handlers::{handle_notification, handle_request, McpServerState};
use crate::protocol::{JsonRpcError, JsonRpcMessage, JsonRpcResponse, RequestId};
use crate::tools::ToolContext;
use crate::transport::{LineTransport, StdioTransport};

pub struct McpServer {
    state: Arc<RwLock<McpServerState>>,
}

impl McpServer {
    /// Server backed by the live services named in `config`
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_context(ToolContext::from_config(config))
    }

    pub fn with_context(tools: ToolContext) -> Self {
        Self {
            state: Arc::new(RwLock::new(McpServerState::new(Arc::new(tools)))),
        }
    }

    pub async fn run_stdio(&self) -> std::io::Result<()> {
        info!("Starting Stellar MCP server (stdio transport)");
        let mut transport = StdioTransport::stdio();
        self.run(&mut transport).await
    }

    /// Serve messages until the reader hits EOF
    pub async fn run<R, W>(&self, transport: &mut LineTransport<R, W>) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let message = match transport.read_message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    info!("EOF received, shutting down");
                    break;
                }
                Err(e) => {
                    error!("Error reading message: {}", e);
                    return Err(e);
                }
            };

            if let Some(response) = self.handle_message(&message).await {
                if let Err(e) = transport.write_response(&response).await {
                    error!("Failed to write response: {}", e);
                    return Err(e);
                }
            }
        }

        info!("Stellar MCP server stopped");
        Ok(())
    }

    /// Process one raw line; requests and unparseable input get a response
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let json: serde_json::Value = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse JSON: {}", e);
                return Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(),
                ));
            }
        };

        match serde_json::from_value::<JsonRpcMessage>(json) {
            Ok(JsonRpcMessage::Request(request)) => {
                let mut state = self.state.write().await;
                Some(handle_request(&mut state, &request).await)
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                let mut state = self.state.write().await;
                handle_notification(&mut state, &notification).await;
                None
            }
            Ok(JsonRpcMessage::Response(_)) => {
                debug!("Ignoring response from client");
                None
            }
            Err(e) => {
                warn!("Not a JSON-RPC message: {}", e);
                Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::invalid_request(),
                ))
            }
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }
}

//! MCP request handlers

use std::sync::Arc;

use stellar_mcp_core::ResourcePaths;
use tracing::{debug, info, warn};

use crate::protocol::*;
use crate::resources::{self, ResourceError};
use crate::tools::{self, ToolContext};

/// MCP Server state
pub struct McpServerState {
    /// Protocol version requested by the client
    pub protocol_version: Option<String>,

    pub initialized: bool,

    pub client_capabilities: Option<ClientCapabilities>,

    pub client_info: Option<ClientInfo>,

    pub tools: Arc<ToolContext>,

    pub resources: ResourcePaths,
}

impl McpServerState {
    pub fn new(tools: Arc<ToolContext>) -> Self {
        let resources = tools.dispatcher.config().resources.clone();
        Self {
            protocol_version: None,
            initialized: false,
            client_capabilities: None,
            client_info: None,
            tools,
            resources,
        }
    }
}

/// Handle an incoming JSON-RPC request
pub async fn handle_request(
    state: &mut McpServerState,
    request: &JsonRpcRequest,
) -> JsonRpcResponse {
    debug!("Handling request: {} (id: {})", request.method, request.id);

    if !state.initialized && request.method != "initialize" && request.method != "ping" {
        return JsonRpcResponse::error(request.id.clone(), JsonRpcError::not_initialized());
    }

    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(state, request).await,
        "ping" => Ok(serde_json::json!({})),

        // Tools
        "tools/list" => handle_tools_list(request).await,
        "tools/call" => handle_tools_call(state, request).await,

        // Resources
        "resources/list" => handle_resources_list(state, request).await,
        "resources/read" => handle_resources_read(state, request).await,

        _ => Err(JsonRpcError::method_not_found(&request.method)),
    };

    match result {
        Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
        Err(error) => JsonRpcResponse::error(request.id.clone(), error),
    }
}

/// Handle an incoming notification
pub async fn handle_notification(state: &mut McpServerState, notification: &JsonRpcNotification) {
    debug!("Handling notification: {}", notification.method);

    match notification.method.as_str() {
        "notifications/initialized" => {
            info!("Client sent initialized notification");
            state.initialized = true;
        }
        "notifications/cancelled" => {
            // Requests are served one at a time, so there is nothing left to abort
            let cancelled = notification
                .params
                .clone()
                .and_then(|p| serde_json::from_value::<CancelledNotification>(p).ok());
            match cancelled {
                Some(c) => warn!(request_id = %c.request_id, reason = ?c.reason, "Request cancelled"),
                None => warn!("Malformed cancellation notification"),
            }
        }
        _ => debug!("Unknown notification: {}", notification.method),
    }
}

fn required_params<T: serde::de::DeserializeOwned>(
    request: &JsonRpcRequest,
) -> Result<T, JsonRpcError> {
    request
        .params
        .as_ref()
        .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))
        .and_then(|p| {
            serde_json::from_value(p.clone())
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
        })
}

fn optional_params<T: serde::de::DeserializeOwned + Default>(
    request: &JsonRpcRequest,
) -> Result<T, JsonRpcError> {
    request
        .params
        .as_ref()
        .map(|p| serde_json::from_value(p.clone()))
        .transpose()
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
        .map(Option::unwrap_or_default)
}

fn to_value<T: serde::Serialize>(result: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

// ============================================================================
// Lifecycle Handlers
// ============================================================================

async fn handle_initialize(
    state: &mut McpServerState,
    request: &JsonRpcRequest,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: InitializeParams = required_params(request)?;

    info!(
        "Initialize request from {} (version: {})",
        params.client_info.name, params.protocol_version
    );

    if params.protocol_version != MCP_PROTOCOL_VERSION {
        // Accepted anyway; the methods served here are stable across versions
        warn!(
            "Protocol version mismatch: client={}, server={}",
            params.protocol_version, MCP_PROTOCOL_VERSION
        );
    }

    state.protocol_version = Some(params.protocol_version);
    state.client_capabilities = Some(params.capabilities);
    state.client_info = Some(params.client_info);

    to_value(InitializeResult::new(MCP_PROTOCOL_VERSION.to_string()))
}

// ============================================================================
// Tools Handlers
// ============================================================================

async fn handle_tools_list(request: &JsonRpcRequest) -> Result<serde_json::Value, JsonRpcError> {
    let _params: ToolsListParams = optional_params(request)?;

    to_value(ToolsListResult {
        tools: tools::get_all_tools(),
        next_cursor: None,
    })
}

async fn handle_tools_call(
    state: &McpServerState,
    request: &JsonRpcRequest,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: ToolsCallParams = required_params(request)?;

    debug!("Calling tool: {}", params.name);
    let result = tools::execute_tool(&state.tools, &params.name, params.arguments).await;
    if result.is_error() {
        debug!(tool = %params.name, "Tool returned an error result");
    }

    to_value(result)
}

// ============================================================================
// Resources Handlers
// ============================================================================

async fn handle_resources_list(
    state: &McpServerState,
    request: &JsonRpcRequest,
) -> Result<serde_json::Value, JsonRpcError> {
    let _params: ResourcesListParams = optional_params(request)?;

    to_value(ResourcesListResult {
        resources: resources::get_all_resources(&state.resources),
        next_cursor: None,
    })
}

async fn handle_resources_read(
    state: &McpServerState,
    request: &JsonRpcRequest,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: ResourcesReadParams = required_params(request)?;

    debug!("Reading resource: {}", params.uri);

    let result = resources::read_resource(&state.resources, &params.uri)
        .await
        .map_err(|e| match e {
            ResourceError::Unknown => JsonRpcError::resource_not_found(&params.uri),
            ResourceError::Unreadable(msg) => JsonRpcError::internal_error(msg),
        })?;

    to_value(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_mcp_core::Config;

    fn state() -> McpServerState {
        McpServerState::new(Arc::new(ToolContext::from_config(Arc::new(Config::default()))))
    }

    fn request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let mut state = state();
        let req = request(
            "initialize",
            Some(serde_json::json!({
                "protocolVersion": "2025-11-25",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            })),
        );

        let response = handle_request(&mut state, &req).await;
        assert!(response.error.is_none());
        assert_eq!(state.client_info.unwrap().name, "test-client");
        // Still waiting for notifications/initialized
        assert!(!state.initialized);
    }

    #[tokio::test]
    async fn test_initialize_without_params() {
        let mut state = state();
        let response = handle_request(&mut state, &request("initialize", None)).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_tools_list_requires_initialization() {
        let mut state = state();
        let response = handle_request(&mut state, &request("tools/list", None)).await;
        assert_eq!(response.error.unwrap().code, -32002);
    }

    #[tokio::test]
    async fn test_ping_before_initialization() {
        let mut state = state();
        let response = handle_request(&mut state, &request("ping", None)).await;
        assert_eq!(response.result, Some(serde_json::json!({})));
    }

    #[tokio::test]
    async fn test_initialized_notification() {
        let mut state = state();
        handle_notification(&mut state, &JsonRpcNotification::new("notifications/initialized"))
            .await;
        assert!(state.initialized);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut state = state();
        state.initialized = true;
        let response = handle_request(&mut state, &request("prompts/list", None)).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_resources_read_unknown_uri() {
        let mut state = state();
        state.initialized = true;
        let req = request(
            "resources/read",
            Some(serde_json::json!({ "uri": "file:///nope" })),
        );
        let error = handle_request(&mut state, &req).await.error.unwrap();
        assert_eq!(error.code, -32002);
        assert_eq!(error.message, "Resource not found: file:///nope");
    }
}

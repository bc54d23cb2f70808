//! Stellar MCP tool definitions
//!
//! Account tools talk to Horizon and friendbot; `sign-and-submit-transaction`
//! runs the core dispatcher.

mod create_account;
mod fund_account;
mod get_account;
mod get_transactions;
mod sign_and_submit;

use std::sync::Arc;

use serde::Deserialize;
use stellar_mcp_core::{Config, Dispatcher, FriendbotClient, HorizonClient};

use crate::protocol::{Tool, ToolsCallResult};

pub use sign_and_submit::outcome_to_result;

/// Collaborators shared by every tool call
pub struct ToolContext {
    pub dispatcher: Arc<Dispatcher>,
    pub horizon: HorizonClient,
    pub friendbot: FriendbotClient,
}

impl ToolContext {
    /// Horizon and friendbot endpoints come from the dispatcher's config
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let horizon = HorizonClient::new(dispatcher.config());
        let friendbot = FriendbotClient::new(dispatcher.config());
        Self {
            dispatcher,
            horizon,
            friendbot,
        }
    }

    pub fn from_config(config: Arc<Config>) -> Self {
        Self::new(Arc::new(Dispatcher::from_config(config)))
    }
}

/// Arguments of the tools keyed by a single account address
#[derive(Debug, Deserialize)]
pub(crate) struct AddressParams {
    pub address: String,
}

impl AddressParams {
    pub(crate) fn parse(arguments: serde_json::Value) -> Result<Self, ToolsCallResult> {
        serde_json::from_value(arguments)
            .map_err(|e| ToolsCallResult::error(format!("Invalid parameters: {}", e)))
    }
}

pub(crate) fn address_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "address": {
                "type": "string",
                "description": description
            }
        },
        "required": ["address"]
    })
}

pub fn get_all_tools() -> Vec<Tool> {
    vec![
        create_account::tool_definition(),
        fund_account::tool_definition(),
        get_account::tool_definition(),
        get_transactions::tool_definition(),
        sign_and_submit::tool_definition(),
    ]
}

/// Execute a tool by name
pub async fn execute_tool(
    ctx: &ToolContext,
    name: &str,
    arguments: serde_json::Value,
) -> ToolsCallResult {
    match name {
        "create-account" => create_account::execute().await,
        "fund-account" => fund_account::execute(ctx, arguments).await,
        "get-account" => get_account::execute(ctx, arguments).await,
        "get-transactions" => get_transactions::execute(ctx, arguments).await,
        "sign-and-submit-transaction" => sign_and_submit::execute(ctx, arguments).await,
        _ => ToolsCallResult::error(format!("Unknown tool: {}", name)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Context whose HTTP endpoints refuse connections
    pub fn offline_context() -> ToolContext {
        let config = Config {
            horizon_url: "http://127.0.0.1:9".to_string(),
            friendbot_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        ToolContext::from_config(Arc::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::offline_context;
    use super::*;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = get_all_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let ctx = offline_context();
        let result = execute_tool(&ctx, "delete-account", serde_json::json!({})).await;
        assert!(result.is_error());
        assert_eq!(result.content[0].as_text(), "Unknown tool: delete-account");
    }

    #[test]
    fn test_address_params_require_address() {
        assert!(AddressParams::parse(serde_json::json!({})).is_err());
        let params = AddressParams::parse(serde_json::json!({ "address": "GABC" })).unwrap();
        assert_eq!(params.address, "GABC");
    }
}

//! Horizon account lookup

use stellar_mcp_core::Error;

use super::{address_schema, AddressParams, ToolContext};
use crate::protocol::{Tool, ToolAnnotations, ToolContent, ToolsCallResult};

pub fn tool_definition() -> Tool {
    Tool {
        name: "get-account".to_string(),
        title: Some("Get Account".to_string()),
        description: "Fetch a minimal set of current info about a Stellar account.".to_string(),
        input_schema: address_schema("The Stellar address to fetch info for"),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(true),
        }),
    }
}

pub async fn execute(ctx: &ToolContext, arguments: serde_json::Value) -> ToolsCallResult {
    let params = match AddressParams::parse(arguments) {
        Ok(params) => params,
        Err(result) => return result,
    };

    match ctx.horizon.load_account(&params.address).await {
        Ok(account) => ToolsCallResult::success(vec![ToolContent::json(&account)]),
        Err(Error::NotFound(_)) => {
            ToolsCallResult::error(format!("Account {} not found", params.address))
        }
        Err(e) => ToolsCallResult::error(format!("Error loading account: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::offline_context;

    #[tokio::test]
    async fn test_unreachable_horizon() {
        let args = serde_json::json!({ "address": "GABC" });
        let result = execute(&offline_context(), args).await;
        assert!(result.is_error());
    }

    #[test]
    fn test_schema_requires_address() {
        let tool = tool_definition();
        assert_eq!(tool.input_schema["required"], serde_json::json!(["address"]));
    }
}

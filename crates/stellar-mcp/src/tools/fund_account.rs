//! Testnet funding through friendbot

use serde_json::json;
use stellar_mcp_core::Error;
use tracing::info;

use super::{address_schema, AddressParams, ToolContext};
use crate::protocol::{Tool, ToolAnnotations, ToolContent, ToolsCallResult};

pub fn tool_definition() -> Tool {
    Tool {
        name: "fund-account".to_string(),
        title: Some("Fund Account".to_string()),
        description: "Fund a Stellar account with testnet lumens.".to_string(),
        input_schema: address_schema("The Stellar address to fund"),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(true),
        }),
    }
}

pub async fn execute(ctx: &ToolContext, arguments: serde_json::Value) -> ToolsCallResult {
    let params = match AddressParams::parse(arguments) {
        Ok(params) => params,
        Err(result) => return result,
    };

    match ctx.friendbot.fund(&params.address).await {
        Ok(_) => {
            info!(address = %params.address, "Account funded");
            ToolsCallResult::success(vec![ToolContent::json(&json!({
                "message": "Account funded successfully"
            }))])
        }
        Err(Error::NotFound(_)) => {
            ToolsCallResult::error(format!("Account {} not found", params.address))
        }
        Err(e) => ToolsCallResult::error(format!("Error funding account: {}", e)),
    }
}

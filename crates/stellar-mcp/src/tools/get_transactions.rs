//! Horizon transaction history

use stellar_mcp_core::Error;

use super::{address_schema, AddressParams, ToolContext};
use crate::protocol::{Tool, ToolAnnotations, ToolContent, ToolsCallResult};

pub fn tool_definition() -> Tool {
    Tool {
        name: "get-transactions".to_string(),
        title: Some("Get Transactions".to_string()),
        description: "Fetch an array of transactions for a given Stellar address.".to_string(),
        input_schema: address_schema("The Stellar address to fetch transactions for"),
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

    match ctx.horizon.transactions_for_account(&params.address).await {
        // Records are large; compact JSON
        Ok(records) => ToolsCallResult::success(vec![ToolContent::text(
            serde_json::Value::Array(records).to_string(),
        )]),
        Err(Error::NotFound(_)) => {
            ToolsCallResult::error(format!("Account {} not found", params.address))
        }
        Err(e) => ToolsCallResult::error(format!("Error loading transactions: {}", e)),
    }
}

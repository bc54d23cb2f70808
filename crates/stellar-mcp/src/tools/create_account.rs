//! Fresh keypair generation

use serde_json::json;
use stellar_mcp_core::Keypair;

use crate::protocol::{Tool, ToolAnnotations, ToolContent, ToolsCallResult};

pub fn tool_definition() -> Tool {
    Tool {
        name: "create-account".to_string(),
        title: Some("Create Account".to_string()),
        description: "Create a new Stellar account.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(false),
        }),
    }
}

/// The account only exists on the ledger once funded
pub async fn execute() -> ToolsCallResult {
    let keypair = Keypair::random();
    ToolsCallResult::success(vec![ToolContent::json(&json!({
        "publicKey": keypair.public_key(),
        "secretKey": keypair.secret(),
    }))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_account_returns_matching_keys() {
        let result = execute().await;
        assert!(!result.is_error());

        let body: serde_json::Value = serde_json::from_str(result.content[0].as_text()).unwrap();
        let public_key = body["publicKey"].as_str().unwrap();
        let secret = body["secretKey"].as_str().unwrap();
        assert!(public_key.starts_with('G'));
        assert_eq!(Keypair::from_secret(secret).unwrap().public_key(), public_key);
    }

    #[tokio::test]
    async fn test_each_call_is_a_new_account() {
        let a = execute().await;
        let b = execute().await;
        assert_ne!(a.content[0], b.content[0]);
    }
}

//! Soroban sign-and-submit tool

use serde::Deserialize;
use serde_json::{json, Value};
use stellar_mcp_core::{validate_contract_id, DispatchOutcome, Error, SignAndSubmitRequest};

use super::ToolContext;
use crate::protocol::{Tool, ToolAnnotations, ToolContent, ToolsCallResult};

const SUCCESS_TEXT: &str = "Transaction sent successfully!";
const PERMISSION_TEXT: &str =
    "Transaction failed: Insufficient permissions to execute the transaction";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignAndSubmitParams {
    pub transaction_xdr: String,
    pub contract_id: String,
    pub secret_key: String,
}

pub fn tool_definition() -> Tool {
    Tool {
        name: "sign-and-submit-transaction".to_string(),
        title: Some("Sign and Submit Transaction".to_string()),
        description: "Sign and submit a Soroban transaction to the Stellar network.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "transactionXdr": {
                    "type": "string",
                    "description": "The transaction XDR to sign and submit"
                },
                "contractId": {
                    "type": "string",
                    "description": "The contract ID to use for the transaction"
                },
                "secretKey": {
                    "type": "string",
                    "description": "The secret key of the account to sign the transaction"
                }
            },
            "required": ["transactionXdr", "contractId", "secretKey"]
        }),
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(false),
            destructive_hint: Some(true),
            idempotent_hint: Some(false),
            open_world_hint: Some(true),
        }),
    }
}

pub async fn execute(ctx: &ToolContext, arguments: Value) -> ToolsCallResult {
    let params: SignAndSubmitParams = match serde_json::from_value(arguments) {
        Ok(p) => p,
        Err(e) => {
            return ToolsCallResult::error(format!("Invalid parameters: {}", e));
        }
    };

    // Rejected here so a bad id never reaches the network
    if let Err(e) = validate_contract_id(&params.contract_id) {
        let message = match &e {
            Error::InvalidArgument(reason) => reason.clone(),
            other => other.to_string(),
        };
        return failure(message, e.details());
    }

    let request = SignAndSubmitRequest {
        transaction_xdr: params.transaction_xdr,
        contract_id: params.contract_id,
        secret_key: params.secret_key,
    };
    outcome_to_result(ctx.dispatcher.sign_and_submit(&request).await)
}

/// Render a dispatch outcome as tool content
pub fn outcome_to_result(outcome: DispatchOutcome) -> ToolsCallResult {
    match outcome {
        DispatchOutcome::Submitted { value } => ToolsCallResult::success(vec![
            ToolContent::text(SUCCESS_TEXT),
            ToolContent::text(value.to_string()),
        ]),
        DispatchOutcome::PermissionDenied { .. } => ToolsCallResult::error(PERMISSION_TEXT),
        DispatchOutcome::Failed { message, details } => failure(message, details),
    }
}

fn failure(message: String, details: Value) -> ToolsCallResult {
    ToolsCallResult::error_content(vec![ToolContent::json(&json!({
        "error": "Transaction failed",
        "message": message,
        "details": details,
    }))])
}

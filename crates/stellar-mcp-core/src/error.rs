//! Error types for the Stellar signing pipeline

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Substring the ledger reports when a wallet rejects an authorization
pub const AUTH_INVALID_ACTION: &str = "Error(Auth, InvalidAction)";

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input or conflicting signer options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A dependent external service is not configured
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The ledger rejected the authorization
    #[error("Authorization denied: {detail}")]
    AuthorizationDenied { detail: Value },

    /// A signature container or ledger value had an unexpected shape
    #[error("Unsupported state: {0}")]
    UnsupportedState(String),

    /// Transport or ledger failure with the raw response attached
    #[error("{message}")]
    NetworkFailure { message: String, details: Value },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Every parse attempt for a transaction input failed
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// A newer ceremony on the same session took over
    #[error("WebAuthn ceremony aborted")]
    CeremonyAborted,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a failed relay response body.
    ///
    /// The body is kept verbatim; only the auth-denied substring changes the
    /// variant.
    pub fn from_relay_failure(body: Value) -> Self {
        if body_mentions(&body, AUTH_INVALID_ACTION) {
            Error::AuthorizationDenied { detail: body }
        } else {
            Error::NetworkFailure {
                message: "Relay rejected the transaction".to_string(),
                details: body,
            }
        }
    }

    /// Raw diagnostic payload for this error
    pub fn details(&self) -> Value {
        match self {
            Error::AuthorizationDenied { detail } => detail.clone(),
            Error::NetworkFailure { details, .. } => details.clone(),
            other => Value::String(other.to_string()),
        }
    }

    pub fn is_authorization_denied(&self) -> bool {
        matches!(self, Error::AuthorizationDenied { .. })
    }
}

fn body_mentions(body: &Value, needle: &str) -> bool {
    match body {
        Value::String(s) => s.contains(needle),
        other => other.to_string().contains(needle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relay_failure_auth_denied() {
        let body = json!({
            "error": "HostError: Error(Auth, InvalidAction)\n\nEvent log (newest first): ..."
        });
        let err = Error::from_relay_failure(body.clone());
        assert!(err.is_authorization_denied());
        assert_eq!(err.details(), body);
    }

    #[test]
    fn test_relay_failure_kept_verbatim() {
        let body = json!({ "error": "tx_bad_seq", "status": 400 });
        let err = Error::from_relay_failure(body.clone());
        assert!(!err.is_authorization_denied());
        assert_eq!(err.details(), body);
    }

    #[test]
    fn test_details_falls_back_to_message() {
        let err = Error::InvalidArgument("bad".to_string());
        assert_eq!(err.details(), json!("Invalid argument: bad"));
    }
}

//! Fee-sponsoring relay submission (Launchtube)

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Config, LaunchtubeConfig};
use crate::error::{Error, Result};

const CLIENT_NAME: &str = "passkey-kit";
const CLIENT_VERSION: &str = "0.10.19";

/// Successful relay response
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    /// Raw JSON body
    pub body: Value,
}

impl RelayResponse {
    /// base64 `TransactionMeta` of the applied transaction
    pub fn result_meta_xdr(&self) -> Result<&str> {
        self.body
            .get("resultMetaXdr")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::UnsupportedState("Relay response has no resultMetaXdr".to_string())
            })
    }
}

/// Submits signed envelopes
#[async_trait]
pub trait Relay: Send + Sync {
    /// `xdr` is a base64 transaction envelope
    async fn submit(&self, xdr: &str, fee: Option<u32>) -> Result<RelayResponse>;
}

/// Launchtube HTTP client
#[derive(Debug, Clone)]
pub struct LaunchtubeClient {
    http: reqwest::Client,
    service: Option<LaunchtubeConfig>,
}

impl LaunchtubeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            service: config.launchtube.clone(),
        }
    }
}

#[async_trait]
impl Relay for LaunchtubeClient {
    async fn submit(&self, xdr: &str, fee: Option<u32>) -> Result<RelayResponse> {
        let service = self.service.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable("Launchtube service not configured".to_string())
        })?;

        let mut form = vec![("xdr", xdr.to_string())];
        if let Some(fee) = fee {
            form.push(("fee", fee.to_string()));
        }

        debug!(fee = ?fee, "Submitting transaction to relay");
        let response = self
            .http
            .post(&service.url)
            .bearer_auth(&service.jwt)
            .header("X-Client-Name", CLIENT_NAME)
            .header("X-Client-Version", CLIENT_VERSION)
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);

        if !status.is_success() {
            debug!(%status, "Relay rejected transaction");
            return Err(Error::from_relay_failure(body));
        }

        info!("Relay accepted transaction");
        Ok(RelayResponse { body })
    }
}

/// JSON body, or the raw text as a JSON string when it isn't JSON
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const JWT: &str = "jwt-token";

    fn client_for(url: String) -> LaunchtubeClient {
        let config = Config {
            launchtube: Some(LaunchtubeConfig {
                url,
                jwt: JWT.to_string(),
            }),
            ..Config::default()
        };
        LaunchtubeClient::new(&config)
    }

    /// Answer one HTTP request on loopback and hand back the raw request text
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&raw) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8(raw).unwrap()
        });
        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    fn request_body(request: &str) -> &str {
        request.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(r#"{"error":"x"}"#), json!({"error": "x"}));
        assert_eq!(parse_body("Bad Gateway"), json!("Bad Gateway"));
    }

    #[test]
    fn test_result_meta_xdr() {
        let ok = RelayResponse {
            body: json!({ "hash": "abc", "resultMetaXdr": "AAAA" }),
        };
        assert_eq!(ok.result_meta_xdr().unwrap(), "AAAA");

        let missing = RelayResponse { body: json!({}) };
        assert!(matches!(
            missing.result_meta_xdr(),
            Err(Error::UnsupportedState(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_posts_form_with_bearer_token() {
        let reply = json!({ "hash": "abc", "resultMetaXdr": "AAAA" });
        let (url, server) = serve_once("200 OK", reply.to_string()).await;

        let response = client_for(url).submit("AAAA", Some(123)).await.unwrap();
        assert_eq!(response.body, reply);

        let request = server.await.unwrap();
        let lowered = request.to_ascii_lowercase();
        assert!(request.starts_with("POST / "));
        assert!(lowered.contains(&format!("authorization: bearer {}", JWT)));
        assert!(lowered.contains("content-type: application/x-www-form-urlencoded"));
        assert!(lowered.contains(&format!("x-client-name: {}", CLIENT_NAME)));
        assert!(lowered.contains(&format!("x-client-version: {}", CLIENT_VERSION)));
        assert_eq!(request_body(&request), "xdr=AAAA&fee=123");
    }

    #[tokio::test]
    async fn test_submit_without_fee_sends_only_xdr() {
        let (url, server) = serve_once("200 OK", json!({}).to_string()).await;

        client_for(url).submit("AAAA", None).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request_body(&request), "xdr=AAAA");
    }

    #[tokio::test]
    async fn test_rejection_body_is_returned_verbatim() {
        let reply = json!({ "error": "txBadSeq", "status": 400, "extras": { "codes": [1, 2] } });
        let (url, server) = serve_once("400 Bad Request", reply.to_string()).await;

        let err = client_for(url).submit("AAAA", None).await.unwrap_err();
        server.await.unwrap();
        match err {
            Error::NetworkFailure { details, .. } => assert_eq!(details, reply),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_rejection_is_authorization_denied() {
        let reply = json!({ "error": "HostError: Error(Auth, InvalidAction)" });
        let (url, server) = serve_once("400 Bad Request", reply.to_string()).await;

        let err = client_for(url).submit("AAAA", None).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, Error::AuthorizationDenied { detail } if detail == reply));
    }

    #[tokio::test]
    async fn test_unconfigured_relay() {
        let client = LaunchtubeClient::new(&Config::default());
        let err = client.submit("AAAA", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Launchtube service not configured");
    }
}

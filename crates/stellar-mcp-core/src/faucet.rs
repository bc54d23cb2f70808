//! Testnet friendbot

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FriendbotClient {
    http: reqwest::Client,
    url: String,
}

impl FriendbotClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.friendbot_url.clone(),
        }
    }

    /// Create and fund `address` with testnet lumens
    pub async fn fund(&self, address: &str) -> Result<Value> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("addr", address)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(address.to_string()));
        }
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(Error::NetworkFailure {
                message: format!("Friendbot request failed with status {}", status),
                details: body,
            });
        }

        info!(%address, "Account funded");
        Ok(body)
    }
}

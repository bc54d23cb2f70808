//! Horizon REST queries

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// The account fields reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    #[serde(rename = "accountId", alias = "account_id")]
    pub account_id: String,
    pub sequence: String,
    #[serde(default)]
    pub balances: Vec<Value>,
    #[serde(default)]
    pub signers: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    records: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct HorizonClient {
    http: reqwest::Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.horizon_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, address: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Horizon request");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(address.to_string()));
        }
        if !status.is_success() {
            let details = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(Error::NetworkFailure {
                message: format!("Horizon request failed with status {}", status),
                details,
            });
        }
        Ok(response.json().await?)
    }

    pub async fn load_account(&self, address: &str) -> Result<AccountSummary> {
        self.get(&format!("/accounts/{}", address), address).await
    }

    /// Most recent page of transactions involving `address`
    pub async fn transactions_for_account(&self, address: &str) -> Result<Vec<Value>> {
        let page: Page = self
            .get(&format!("/accounts/{}/transactions", address), address)
            .await?;
        Ok(page.embedded.records)
    }
}

//! Soroban RPC client
//!
//! JSON-RPC 2.0 over HTTP. Only the handful of methods the signing pipeline
//! needs are wrapped; [`SorobanRpc`] is the seam used by tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stellar_xdr::curr::{
    ContractDataDurability, LedgerKey, LedgerKeyContractData, Limits, ReadXdr, ScVal,
    SorobanAuthorizationEntry, SorobanTransactionData, TransactionEnvelope, WriteXdr,
};
use tracing::{debug, trace};

use crate::address::parse_sc_address;
use crate::config::Config;
use crate::error::{Error, Result};

/// `getLatestLedger` result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLedger {
    pub sequence: u32,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub protocol_version: u32,
}

/// Decoded `simulateTransaction` result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResult {
    pub transaction_data: Option<SorobanTransactionData>,
    pub min_resource_fee: i64,
    /// Authorization entries the invocation requires
    pub auth: Vec<SorobanAuthorizationEntry>,
    pub return_value: Option<ScVal>,
    pub latest_ledger: u32,
}

/// A single ledger entry from `getLedgerEntries`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResult {
    pub key: String,
    /// base64 `LedgerEntryData`
    pub xdr: String,
    #[serde(rename = "lastModifiedLedgerSeq", default)]
    pub last_modified_ledger: u32,
    #[serde(rename = "liveUntilLedgerSeq", default)]
    pub live_until_ledger: Option<u32>,
}

/// Ledger queries used by the signing pipeline
#[async_trait]
pub trait SorobanRpc: Send + Sync {
    async fn latest_ledger(&self) -> Result<LatestLedger>;

    async fn simulate_transaction(&self, envelope: &TransactionEnvelope) -> Result<SimulationResult>;

    async fn get_contract_data(
        &self,
        contract_id: &str,
        key: ScVal,
        durability: ContractDataDurability,
    ) -> Result<LedgerEntryResult>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    #[serde(default)]
    latest_ledger: u32,
    min_resource_fee: Option<String>,
    transaction_data: Option<String>,
    error: Option<String>,
    #[serde(default)]
    results: Vec<SimulateHostFunctionResult>,
}

#[derive(Debug, Deserialize)]
struct SimulateHostFunctionResult {
    xdr: Option<String>,
    #[serde(default)]
    auth: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LedgerEntriesResponse {
    #[serde(default)]
    entries: Option<Vec<LedgerEntryResult>>,
}

/// HTTP Soroban RPC client
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Option<String>,
}

impl RpcClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.rpc_url.clone(),
        }
    }

    fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| Error::ServiceUnavailable("RPC service not configured".to_string()))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: Serialize + Send,
        R: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        trace!(method, "RPC request");

        let response = self.http.post(self.url()?).json(&request).send().await?;
        let body: RpcResponse<R> = response.json().await?;

        if let Some(error) = body.error {
            return Err(Error::NetworkFailure {
                message: format!("RPC error {}: {}", error.code, error.message),
                details: serde_json::to_value(&error)?,
            });
        }
        body.result.ok_or_else(|| Error::NetworkFailure {
            message: format!("RPC {} returned no result", method),
            details: Value::Null,
        })
    }
}

#[async_trait]
impl SorobanRpc for RpcClient {
    async fn latest_ledger(&self) -> Result<LatestLedger> {
        // getLatestLedger rejects an empty params object
        self.request::<Value, _>("getLatestLedger", None).await
    }

    async fn simulate_transaction(&self, envelope: &TransactionEnvelope) -> Result<SimulationResult> {
        let params = serde_json::json!({
            "transaction": envelope.to_xdr_base64(Limits::none())?,
        });
        let raw: SimulateResponse = self.request("simulateTransaction", Some(params)).await?;
        parse_simulation(raw)
    }

    async fn get_contract_data(
        &self,
        contract_id: &str,
        key: ScVal,
        durability: ContractDataDurability,
    ) -> Result<LedgerEntryResult> {
        let ledger_key = LedgerKey::ContractData(LedgerKeyContractData {
            contract: parse_sc_address(contract_id)?,
            key,
            durability,
        });
        let params = serde_json::json!({
            "keys": [ledger_key.to_xdr_base64(Limits::none())?],
        });

        let raw: LedgerEntriesResponse = self.request("getLedgerEntries", Some(params)).await?;
        raw.entries
            .and_then(|entries| entries.into_iter().next())
            .ok_or_else(|| Error::NotFound(format!("Contract data for {}", contract_id)))
    }
}

fn parse_simulation(raw: SimulateResponse) -> Result<SimulationResult> {
    if let Some(error) = raw.error {
        debug!(%error, "Simulation reported an error");
        return Err(Error::NetworkFailure {
            message: "Simulation failed".to_string(),
            details: Value::String(error),
        });
    }

    let transaction_data = raw
        .transaction_data
        .map(|data| SorobanTransactionData::from_xdr_base64(data, Limits::none()))
        .transpose()?;

    let min_resource_fee = match raw.min_resource_fee {
        Some(fee) => fee
            .parse::<i64>()
            .map_err(|e| Error::Parse(format!("Invalid minResourceFee: {}", e)))?,
        None => 0,
    };

    let mut auth = Vec::new();
    let mut return_value = None;
    if let Some(first) = raw.results.into_iter().next() {
        for entry in first.auth {
            auth.push(SorobanAuthorizationEntry::from_xdr_base64(entry, Limits::none())?);
        }
        return_value = first
            .xdr
            .map(|xdr| ScVal::from_xdr_base64(xdr, Limits::none()))
            .transpose()?;
    }

    Ok(SimulationResult {
        transaction_data,
        min_resource_fee,
        auth,
        return_value,
        latest_ledger: raw.latest_ledger,
    })
}

//! Wallet signer index (Mercury Zephyr programs)
//!
//! Two functions of the indexing program are used: `get_signers_by_address`
//! lists the signers of a wallet, `get_addresses_by_signer` finds wallets a
//! signer belongs to.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use stellar_xdr::curr::ContractDataDurability;
use tracing::debug;

use crate::address::validate_contract_id;
use crate::config::{Config, MercuryConfig};
use crate::error::{Error, Result};
use crate::rpc::SorobanRpc;
use crate::scval;
use crate::signer::{SignerEntry, SignerKind, SignerStorage};

/// Reverse lookup criteria; exactly one field must be set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerQuery {
    /// base64url WebAuthn credential id
    pub key_id: Option<String>,
    /// `G...` Ed25519 signer
    pub public_key: Option<String>,
    /// `C...` policy signer
    pub policy: Option<String>,
}

impl SignerQuery {
    fn kind_and_key(&self) -> Result<(SignerKind, &str)> {
        match (&self.key_id, &self.public_key, &self.policy) {
            (Some(key), None, None) => Ok((SignerKind::Secp256r1, key)),
            (None, Some(key), None) => Ok((SignerKind::Ed25519, key)),
            (None, None, Some(key)) => Ok((SignerKind::Policy, key)),
            _ => Err(Error::InvalidArgument(
                "Exactly one of key_id, public_key, or policy must be provided".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    project_name: &'a str,
    mode: Value,
}

/// Mercury indexing client
pub struct MercuryClient {
    http: reqwest::Client,
    config: Option<MercuryConfig>,
    rpc: Arc<dyn SorobanRpc>,
}

impl MercuryClient {
    pub fn new(config: &Config, rpc: Arc<dyn SorobanRpc>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: config.mercury.clone(),
            rpc,
        }
    }

    async fn execute<A, R>(&self, fname: &str, arguments: A) -> Result<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let config = self.config.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable("Mercury service not configured".to_string())
        })?;

        let body = ExecuteRequest {
            project_name: &config.project_name,
            mode: json!({
                "Function": {
                    "fname": fname,
                    "arguments": serde_json::to_string(&arguments)?,
                }
            }),
        };

        let mut request = self
            .http
            .post(format!("{}/zephyr/execute", config.url.trim_end_matches('/')))
            .json(&body);
        if let Some(authorization) = config.authorization() {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        debug!(fname, "Querying signer index");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(Error::NetworkFailure {
                message: format!("Indexer request failed with status {}", status),
                details,
            });
        }
        Ok(response.json().await?)
    }

    /// Signers of a wallet, with temporary ones re-checked against the ledger
    pub async fn get_signers(&self, contract_id: &str) -> Result<Vec<SignerEntry>> {
        validate_contract_id(contract_id)?;
        let signers: Vec<SignerEntry> = self
            .execute("get_signers_by_address", json!({ "address": contract_id }))
            .await?;
        mark_evicted(self.rpc.as_ref(), contract_id, signers).await
    }

    /// Wallet at `index` among those `query`'s signer belongs to
    pub async fn get_contract_id(&self, query: &SignerQuery, index: usize) -> Result<Option<String>> {
        let (kind, key) = query.kind_and_key()?;
        let addresses: Vec<String> = self
            .execute("get_addresses_by_signer", json!({ "key": key, "kind": kind }))
            .await?;
        Ok(addresses.into_iter().nth(index))
    }
}

/// Flag temporary signers whose ledger entry can't be found.
///
/// Any lookup failure counts as eviction.
async fn mark_evicted(
    rpc: &dyn SorobanRpc,
    contract_id: &str,
    mut signers: Vec<SignerEntry>,
) -> Result<Vec<SignerEntry>> {
    for signer in signers.iter_mut() {
        if signer.storage != SignerStorage::Temporary {
            continue;
        }
        let key = scval::bytes(&signer.key_bytes()?)?;
        if let Err(e) = rpc
            .get_contract_data(contract_id, key, ContractDataDurability::Temporary)
            .await
        {
            debug!(signer = %signer.key, error = %e, "Temporary signer not live");
            signer.evicted = true;
        }
    }
    Ok(signers)
}

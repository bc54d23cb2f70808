//! In-memory collaborators for tests
//!
//! [`MockRpc`], [`MockRelay`] and [`MockAuthenticator`] stand in for the
//! Soroban RPC node, the fee-sponsoring relay and a WebAuthn authenticator.
//! Each records what it was asked so tests can assert on traffic.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    ContractDataDurability, HostFunction, InvokeContractArgs, InvokeHostFunctionOp, LedgerKey,
    Limits, Memo, Operation, OperationBody, Preconditions, ReadXdr, ScSymbol, ScVal,
    SequenceNumber, SorobanAddressCredentials, SorobanAuthorizationEntry,
    SorobanAuthorizedFunction, SorobanAuthorizedInvocation, SorobanCredentials,
    SorobanTransactionData, Transaction, TransactionEnvelope, TransactionExt,
    TransactionV1Envelope, VecM, WriteXdr,
};

use crate::address::parse_sc_address;
use crate::error::{Error, Result};
use crate::keypair::Keypair;
use crate::relay::{Relay, RelayResponse};
use crate::rpc::{LatestLedger, LedgerEntryResult, SimulationResult, SorobanRpc};
use crate::webauthn::{AuthenticationOptions, AuthenticationResponse, Authenticator};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// RPC
// ============================================================================

/// Scripted Soroban RPC node
pub struct MockRpc {
    latest_ledger: u32,
    simulation: std::result::Result<SimulationResult, String>,
    live_keys: HashSet<Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self {
            latest_ledger: 1000,
            simulation: Ok(SimulationResult::default()),
            live_keys: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest_ledger(mut self, sequence: u32) -> Self {
        self.latest_ledger = sequence;
        self
    }

    pub fn with_simulation(mut self, simulation: SimulationResult) -> Self {
        self.simulation = Ok(simulation);
        self
    }

    /// Simulation responds with an error string
    pub fn with_simulation_error(mut self, error: impl Into<String>) -> Self {
        self.simulation = Err(error.into());
        self
    }

    /// Contract data stored under `key` is reported live
    pub fn with_contract_data(mut self, key: &ScVal) -> Result<Self> {
        self.live_keys.insert(key.to_xdr(Limits::none())?);
        Ok(self)
    }

    /// Method names in call order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, method: &str) {
        lock(&self.calls).push(method.to_string());
    }
}

#[async_trait]
impl SorobanRpc for MockRpc {
    async fn latest_ledger(&self) -> Result<LatestLedger> {
        self.record("getLatestLedger");
        Ok(LatestLedger {
            sequence: self.latest_ledger,
            id: String::new(),
            protocol_version: 23,
        })
    }

    async fn simulate_transaction(&self, _envelope: &TransactionEnvelope) -> Result<SimulationResult> {
        self.record("simulateTransaction");
        match &self.simulation {
            Ok(result) => Ok(SimulationResult {
                latest_ledger: self.latest_ledger,
                ..result.clone()
            }),
            Err(error) => Err(Error::NetworkFailure {
                message: "Simulation failed".to_string(),
                details: Value::String(error.clone()),
            }),
        }
    }

    async fn get_contract_data(
        &self,
        contract_id: &str,
        key: ScVal,
        _durability: ContractDataDurability,
    ) -> Result<LedgerEntryResult> {
        self.record("getLedgerEntries");
        if !self.live_keys.contains(&key.to_xdr(Limits::none())?) {
            return Err(Error::NotFound(format!("Contract data for {}", contract_id)));
        }
        Ok(LedgerEntryResult {
            key: key.to_xdr_base64(Limits::none())?,
            xdr: String::new(),
            last_modified_ledger: self.latest_ledger,
            live_until_ledger: Some(self.latest_ledger.saturating_add(100)),
        })
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Relay returning a fixed response
pub struct MockRelay {
    response: std::result::Result<Value, Value>,
    submissions: Mutex<Vec<String>>,
}

impl MockRelay {
    /// Accepts everything, answering with `body`
    pub fn accepting(body: Value) -> Self {
        Self {
            response: Ok(body),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Accepts everything; the applied meta carries `return_value`
    pub fn returning(return_value: ScVal) -> Result<Self> {
        Ok(Self::accepting(json!({
            "hash": "0".repeat(64),
            "resultMetaXdr": transaction_meta_v3(return_value)?,
        })))
    }

    /// Rejects everything with `body` as the failure detail
    pub fn rejecting(body: Value) -> Self {
        Self {
            response: Err(body),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// base64 envelopes submitted so far
    pub fn submissions(&self) -> Vec<String> {
        lock(&self.submissions).clone()
    }
}

#[async_trait]
impl Relay for MockRelay {
    async fn submit(&self, xdr: &str, _fee: Option<u32>) -> Result<RelayResponse> {
        lock(&self.submissions).push(xdr.to_string());
        match &self.response {
            Ok(body) => Ok(RelayResponse { body: body.clone() }),
            Err(body) => Err(Error::from_relay_failure(body.clone())),
        }
    }
}

// ============================================================================
// Authenticator
// ============================================================================

/// Software passkey backed by a fixed P-256 key
pub struct MockAuthenticator {
    credential_id: Vec<u8>,
    seed: [u8; 32],
    last_options: Mutex<Option<AuthenticationOptions>>,
}

impl MockAuthenticator {
    pub fn new(credential_id: Vec<u8>, seed: [u8; 32]) -> Self {
        Self {
            credential_id,
            seed,
            last_options: Mutex::new(None),
        }
    }

    fn signing_key(&self) -> Result<SigningKey> {
        SigningKey::from_slice(&self.seed).map_err(|e| Error::Crypto(format!("Invalid P-256 seed: {}", e)))
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        Ok(VerifyingKey::from(&self.signing_key()?))
    }

    /// Options of the most recent ceremony
    pub fn last_options(&self) -> Option<AuthenticationOptions> {
        lock(&self.last_options).clone()
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn start_authentication(
        &self,
        options: AuthenticationOptions,
    ) -> Result<AuthenticationResponse> {
        let origin = options.rp_id.as_deref().unwrap_or("localhost");
        let client_data_json = serde_json::to_vec(&json!({
            "type": "webauthn.get",
            "challenge": options.challenge,
            "origin": format!("https://{}", origin),
        }))?;

        // rpIdHash || flags (UP | UV) || signCount
        let mut authenticator_data = Sha256::digest(origin.as_bytes()).to_vec();
        authenticator_data.push(0x05);
        authenticator_data.extend_from_slice(&1u32.to_be_bytes());

        let mut signed = authenticator_data.clone();
        signed.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature: Signature = self.signing_key()?.sign(&signed);

        *lock(&self.last_options) = Some(options);
        Ok(AuthenticationResponse {
            id: base64::Engine::encode(
                &base64::engine::general_purpose::URL_SAFE_NO_PAD,
                &self.credential_id,
            ),
            authenticator_data,
            client_data_json,
            signature: signature.to_der().as_bytes().to_vec(),
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Unsigned address-credential entry authorizing `transfer` on behalf of
/// `address`
pub fn address_auth_entry(address: &str, nonce: i64) -> Result<SorobanAuthorizationEntry> {
    let sc_address = parse_sc_address(address)?;
    Ok(SorobanAuthorizationEntry {
        credentials: SorobanCredentials::Address(SorobanAddressCredentials {
            address: sc_address.clone(),
            nonce,
            signature_expiration_ledger: 0,
            signature: ScVal::Void,
        }),
        root_invocation: SorobanAuthorizedInvocation {
            function: SorobanAuthorizedFunction::ContractFn(InvokeContractArgs {
                contract_address: sc_address,
                function_name: ScSymbol::try_from(b"transfer".to_vec())?,
                args: VecM::default(),
            }),
            sub_invocations: VecM::default(),
        },
    })
}

/// V1 envelope from `source` calling `transfer` on a fixed token contract
pub fn contract_call_envelope(
    source: &Keypair,
    auth: Vec<SorobanAuthorizationEntry>,
) -> Result<TransactionEnvelope> {
    let operation = Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function: HostFunction::InvokeContract(InvokeContractArgs {
                contract_address: parse_sc_address(&stellar_strkey::Contract([1u8; 32]).to_string())?,
                function_name: ScSymbol::try_from(b"transfer".to_vec())?,
                args: VecM::default(),
            }),
            auth: auth.try_into()?,
        }),
    };

    Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
        tx: Transaction {
            source_account: source.muxed_account(),
            fee: 100,
            seq_num: SequenceNumber(1),
            cond: Preconditions::None,
            memo: Memo::None,
            operations: vec![operation].try_into()?,
            ext: TransactionExt::V0,
        },
        signatures: VecM::default(),
    }))
}

/// Resource annotation declaring `read_write` as the write footprint
pub fn soroban_data(read_write: &[LedgerKey], resource_fee: i64) -> Result<SorobanTransactionData> {
    // ext(0) | read_only[] | read_write[] | instructions | read bytes | write bytes | resource fee
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&(read_write.len() as u32).to_be_bytes());
    for key in read_write {
        bytes.extend(key.to_xdr(Limits::none())?);
    }
    bytes.extend_from_slice(&1_000_000u32.to_be_bytes());
    bytes.extend_from_slice(&1_000u32.to_be_bytes());
    bytes.extend_from_slice(&1_000u32.to_be_bytes());
    bytes.extend_from_slice(&resource_fee.to_be_bytes());
    Ok(SorobanTransactionData::from_xdr(bytes, Limits::none())?)
}

/// base64 `TransactionMeta::V3` whose Soroban return value is `value`
pub fn transaction_meta_v3(value: ScVal) -> Result<String> {
    // TransactionMeta v3: ext | before[] | operations[] | after[] | soroban_meta?
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&3u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    // SorobanTransactionMeta: ext(0) | events[] | return_value | diagnostic_events[]
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend(value.to_xdr(Limits::none())?);
    bytes.extend_from_slice(&0u32.to_be_bytes());

    let meta = stellar_xdr::curr::TransactionMeta::from_xdr(bytes, Limits::none())?;
    Ok(meta.to_xdr_base64(Limits::none())?)
}

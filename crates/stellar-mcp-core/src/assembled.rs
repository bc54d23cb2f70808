//! Assembled Soroban transactions
//!
//! An [`AssembledTransaction`] is a V1 envelope carrying a single
//! `InvokeHostFunction` operation, optionally enriched by simulation. Callers
//! hand in transactions framed in several ways; [`assemble`] normalizes them
//! through an ordered list of parse attempts, first success wins.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    FeeBumpTransactionInnerTx, HostFunction, InvokeHostFunctionOp, Limits, Memo, MuxedAccount,
    Operation, OperationBody, ReadXdr, SorobanAuthorizationEntry, SorobanCredentials,
    Transaction, TransactionEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, VecM, WriteXdr,
};
use tracing::debug;

use crate::address::{muxed_account_to_strkey, sc_address_to_strkey};
use crate::auth::network_id;
use crate::error::{Error, Result};
use crate::keypair::Keypair;
use crate::rpc::{SimulationResult, SorobanRpc};

/// Minimum inclusion fee (stroops)
pub const BASE_FEE: u32 = 100;

/// A contract invocation ready for simulation, signing and submission
#[derive(Debug, Clone)]
pub struct AssembledTransaction {
    envelope: TransactionV1Envelope,
    network_passphrase: String,
    method: Option<String>,
    simulation: Option<SimulationResult>,
    rebuilt: bool,
}

impl AssembledTransaction {
    /// Wrap a V1 envelope whose first operation invokes a host function
    pub fn from_envelope(envelope: TransactionEnvelope, network_passphrase: &str) -> Result<Self> {
        let TransactionEnvelope::Tx(envelope) = envelope else {
            return Err(Error::Parse("Expected a V1 transaction envelope".to_string()));
        };
        let op = first_invoke_op(&envelope.tx.operations)?;
        let method = match &op.host_function {
            HostFunction::InvokeContract(args) => Some(args.function_name.0.to_utf8_string_lossy()),
            _ => None,
        };

        Ok(Self {
            envelope,
            network_passphrase: network_passphrase.to_string(),
            method,
            simulation: None,
            rebuilt: false,
        })
    }

    pub fn from_xdr(xdr: &str, network_passphrase: &str) -> Result<Self> {
        let envelope = TransactionEnvelope::from_xdr_base64(xdr.trim(), Limits::none())?;
        Self::from_envelope(envelope, network_passphrase)
    }

    pub fn envelope(&self) -> TransactionEnvelope {
        TransactionEnvelope::Tx(self.envelope.clone())
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    /// Invoked contract function, when the host function is a contract call
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn simulation(&self) -> Option<&SimulationResult> {
        self.simulation.as_ref()
    }

    pub fn is_simulated(&self) -> bool {
        self.simulation.is_some()
    }

    /// Rebuilt from a bare operation, or never resource-annotated
    pub fn needs_simulation(&self) -> bool {
        self.simulation.is_none()
            && (self.rebuilt || matches!(self.transaction().ext, TransactionExt::V0))
    }

    pub fn transaction(&self) -> &Transaction {
        &self.envelope.tx
    }

    /// Source account of the envelope as a strkey
    pub fn source_account(&self) -> String {
        muxed_account_to_strkey(&self.transaction().source_account)
    }

    fn invoke_op(&self) -> Result<&InvokeHostFunctionOp> {
        first_invoke_op(&self.transaction().operations)
    }

    pub fn auth_entries(&self) -> Vec<SorobanAuthorizationEntry> {
        self.invoke_op()
            .map(|op| op.auth.to_vec())
            .unwrap_or_default()
    }

    /// Replace the authorization entries of the invocation
    pub fn set_auth_entries(&mut self, entries: Vec<SorobanAuthorizationEntry>) -> Result<()> {
        let tx = &mut self.envelope.tx;
        let mut ops = tx.operations.to_vec();
        match ops.first_mut().map(|op| &mut op.body) {
            Some(OperationBody::InvokeHostFunction(op)) => op.auth = entries.try_into()?,
            _ => {
                return Err(Error::UnsupportedState(
                    "Transaction has no host function invocation".to_string(),
                ))
            }
        }
        tx.operations = ops.try_into()?;
        Ok(())
    }

    /// Simulate and fold resources, fee and authorization into the envelope.
    ///
    /// Existing signatures are dropped since the fee changes.
    pub async fn simulate(&mut self, rpc: &dyn SorobanRpc) -> Result<&SimulationResult> {
        let result = rpc.simulate_transaction(&self.envelope()).await?;
        debug!(
            min_resource_fee = result.min_resource_fee,
            auth_entries = result.auth.len(),
            "Simulation complete"
        );

        {
            let v1 = &mut self.envelope;
            let previous_resource_fee = match &v1.tx.ext {
                TransactionExt::V1(data) => data.resource_fee,
                TransactionExt::V0 => 0,
            };
            let inclusion_fee = i64::from(v1.tx.fee) - previous_resource_fee;
            let fee = inclusion_fee.max(i64::from(BASE_FEE)) + result.min_resource_fee;
            v1.tx.fee = u32::try_from(fee).unwrap_or(u32::MAX);

            if let Some(data) = &result.transaction_data {
                v1.tx.ext = TransactionExt::V1(data.clone());
            }
            v1.signatures = VecM::default();
        }

        if self.auth_entries().is_empty() && !result.auth.is_empty() {
            self.set_auth_entries(result.auth.clone())?;
        }

        self.rebuilt = false;
        Ok(self.simulation.insert(result))
    }

    /// No authorization required and nothing written
    pub fn is_read_call(&self) -> bool {
        let Some(sim) = &self.simulation else {
            return false;
        };
        let writes = sim
            .transaction_data
            .as_ref()
            .map(|data| data.resources.footprint.read_write.len())
            .unwrap_or(0);
        sim.auth.is_empty() && writes == 0
    }

    /// Addresses, other than the invoker, that must sign an entry.
    ///
    /// Order of first appearance is kept.
    pub fn needs_non_invoker_signing_by(&self, include_already_signed: bool) -> Vec<String> {
        let mut addresses: Vec<String> = Vec::new();
        for op in self.transaction().operations.iter() {
            let OperationBody::InvokeHostFunction(invoke) = &op.body else {
                continue;
            };
            for entry in invoke.auth.iter() {
                let SorobanCredentials::Address(creds) = &entry.credentials else {
                    continue;
                };
                if !include_already_signed && creds.signature != stellar_xdr::curr::ScVal::Void {
                    continue;
                }
                let address = sc_address_to_strkey(&creds.address);
                if !addresses.contains(&address) {
                    addresses.push(address);
                }
            }
        }
        addresses
    }

    /// Hash signed by envelope signers
    pub fn hash(&self) -> Result<[u8; 32]> {
        let payload = TransactionSignaturePayload {
            network_id: network_id(&self.network_passphrase),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(
                self.transaction().clone(),
            ),
        };
        Ok(Sha256::digest(payload.to_xdr(Limits::none())?).into())
    }

    /// Append an envelope signature
    pub fn sign(&mut self, keypair: &Keypair) -> Result<()> {
        let decorated = keypair.sign_decorated(&self.hash()?)?;
        let v1 = &mut self.envelope;
        let mut signatures = v1.signatures.to_vec();
        signatures.push(decorated);
        v1.signatures = signatures.try_into()?;
        Ok(())
    }

    pub fn signature_count(&self) -> usize {
        self.envelope.signatures.len()
    }

    /// base64 envelope XDR
    pub fn to_xdr(&self) -> Result<String> {
        Ok(self.envelope().to_xdr_base64(Limits::none())?)
    }
}

fn first_invoke_op(operations: &VecM<Operation, 100>) -> Result<&InvokeHostFunctionOp> {
    match operations.first().map(|op| &op.body) {
        Some(OperationBody::InvokeHostFunction(op)) => Ok(op),
        Some(_) => Err(Error::Parse(
            "First operation is not a host function invocation".to_string(),
        )),
        None => Err(Error::Parse("Transaction has no operations".to_string())),
    }
}

// ============================================================================
// Input normalization
// ============================================================================

/// Transaction shapes accepted by the signing pipeline
#[derive(Debug, Clone)]
pub enum TransactionInput {
    Assembled(AssembledTransaction),
    Xdr(String),
    Envelope(TransactionEnvelope),
}

impl From<AssembledTransaction> for TransactionInput {
    fn from(tx: AssembledTransaction) -> Self {
        TransactionInput::Assembled(tx)
    }
}

impl From<String> for TransactionInput {
    fn from(xdr: String) -> Self {
        TransactionInput::Xdr(xdr)
    }
}

impl From<&str> for TransactionInput {
    fn from(xdr: &str) -> Self {
        TransactionInput::Xdr(xdr.to_string())
    }
}

impl From<TransactionEnvelope> for TransactionInput {
    fn from(envelope: TransactionEnvelope) -> Self {
        TransactionInput::Envelope(envelope)
    }
}

/// Parse attempts for an envelope, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseAttempt {
    /// V1 envelope invoking a contract function, used as is
    ContractCall,
    /// Any framing whose first operation invokes a host function; the
    /// function is rebuilt into a fresh transaction
    BareOperation,
}

const PARSE_ATTEMPTS: [ParseAttempt; 2] = [ParseAttempt::ContractCall, ParseAttempt::BareOperation];

impl ParseAttempt {
    fn run(self, envelope: &TransactionEnvelope, passphrase: &str) -> Result<AssembledTransaction> {
        match self {
            ParseAttempt::ContractCall => {
                let tx = AssembledTransaction::from_envelope(envelope.clone(), passphrase)?;
                if tx.method().is_none() {
                    return Err(Error::Parse("Host function is not a contract call".to_string()));
                }
                Ok(tx)
            }
            ParseAttempt::BareOperation => rebuild_from_operation(envelope, passphrase),
        }
    }
}

/// Normalize any accepted input into an assembled transaction
pub fn assemble(input: TransactionInput, network_passphrase: &str) -> Result<AssembledTransaction> {
    let envelope = match input {
        TransactionInput::Assembled(tx) => return Ok(tx),
        TransactionInput::Xdr(xdr) => TransactionEnvelope::from_xdr_base64(xdr.trim(), Limits::none())
            .map_err(|e| Error::Parse(format!("Invalid transaction XDR: {}", e)))?,
        TransactionInput::Envelope(envelope) => envelope,
    };

    let mut failures = Vec::new();
    for attempt in PARSE_ATTEMPTS {
        match attempt.run(&envelope, network_passphrase) {
            Ok(tx) => {
                debug!(?attempt, method = ?tx.method(), "Transaction input parsed");
                return Ok(tx);
            }
            Err(e) => failures.push(format!("{:?}: {}", attempt, e)),
        }
    }

    Err(Error::Parse(format!(
        "Unrecognized transaction input ({})",
        failures.join("; ")
    )))
}

fn rebuild_from_operation(
    envelope: &TransactionEnvelope,
    passphrase: &str,
) -> Result<AssembledTransaction> {
    let (source_account, seq_num, cond, operations) = match envelope {
        TransactionEnvelope::TxV0(v0) => (
            MuxedAccount::Ed25519(v0.tx.source_account_ed25519.clone()),
            v0.tx.seq_num.clone(),
            match &v0.tx.time_bounds {
                Some(bounds) => stellar_xdr::curr::Preconditions::Time(bounds.clone()),
                None => stellar_xdr::curr::Preconditions::None,
            },
            &v0.tx.operations,
        ),
        TransactionEnvelope::Tx(v1) => (
            v1.tx.source_account.clone(),
            v1.tx.seq_num.clone(),
            v1.tx.cond.clone(),
            &v1.tx.operations,
        ),
        TransactionEnvelope::TxFeeBump(bump) => match &bump.tx.inner_tx {
            FeeBumpTransactionInnerTx::Tx(inner) => (
                inner.tx.source_account.clone(),
                inner.tx.seq_num.clone(),
                inner.tx.cond.clone(),
                &inner.tx.operations,
            ),
        },
    };

    let host_function = first_invoke_op(operations)?.host_function.clone();
    let operation = Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function,
            auth: VecM::default(),
        }),
    };

    let tx = Transaction {
        source_account,
        fee: BASE_FEE,
        seq_num,
        cond,
        memo: Memo::None,
        operations: vec![operation].try_into()?,
        ext: TransactionExt::V0,
    };

    let mut assembled = AssembledTransaction::from_envelope(
        TransactionEnvelope::Tx(TransactionV1Envelope {
            tx,
            signatures: VecM::default(),
        }),
        passphrase,
    )?;
    assembled.rebuilt = true;
    Ok(assembled)
}

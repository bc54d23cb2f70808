//! Sign-and-submit pipeline
//!
//! ```text
//! Received -> Parsed -> Simulated -> ReadOnly ------------------> Submitted -> Decoded
//!                                 \-> ResolvingSigner -> Signed -/
//! ```
//!
//! Any step may move to `Failed`. Read-only calls skip signing entirely.
//! Otherwise the transaction is signed either for a contract wallet (through
//! [`PasskeyWallet`] with the caller's keypair as signer) or directly by the
//! caller's account.

use std::sync::Arc;

use serde_json::Value;
use stellar_xdr::curr::SorobanCredentials;
use tracing::{debug, info, warn};

use crate::address::{sc_address_to_strkey, validate_contract_id};
use crate::assembled::{assemble, AssembledTransaction, TransactionInput};
use crate::auth::authorize_entry;
use crate::config::Config;
use crate::decoder::decode_return_value;
use crate::error::{Error, Result};
use crate::keypair::Keypair;
use crate::passkey::{PasskeyWallet, SignOptions};
use crate::relay::{LaunchtubeClient, Relay};
use crate::resolver::resolve_signer;
use crate::rpc::{RpcClient, SorobanRpc};
use crate::webauthn::Authenticator;

/// Ledgers a classic account signature stays valid for
pub const KEYPAIR_VALIDITY_LEDGERS: u32 = 100;

/// Input of a sign-and-submit call
#[derive(Debug, Clone)]
pub struct SignAndSubmitRequest {
    /// base64 transaction envelope
    pub transaction_xdr: String,
    /// Contract being invoked (`C...`)
    pub contract_id: String,
    /// `S...` secret of the signing account
    pub secret_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Applied; `value` is the decoded contract return value
    Submitted { value: Value },
    /// The ledger rejected the authorization
    PermissionDenied { detail: Value },
    Failed { message: String, details: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Received,
    Parsed,
    Simulated,
    ReadOnly,
    ResolvingSigner,
    Signed,
    Submitted,
    Decoded,
}

fn enter(state: &mut DispatchState, next: DispatchState) {
    debug!(from = ?state, to = ?next, "Dispatch transition");
    *state = next;
}

pub struct Dispatcher {
    config: Arc<Config>,
    rpc: Arc<dyn SorobanRpc>,
    relay: Arc<dyn Relay>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, rpc: Arc<dyn SorobanRpc>, relay: Arc<dyn Relay>) -> Self {
        Self {
            config,
            rpc,
            relay,
            authenticator: None,
        }
    }

    /// Dispatcher talking to the configured RPC node and relay
    pub fn from_config(config: Arc<Config>) -> Self {
        let rpc = Arc::new(RpcClient::new(&config));
        let relay = Arc::new(LaunchtubeClient::new(&config));
        Self::new(config, rpc, relay)
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn sign_and_submit(&self, request: &SignAndSubmitRequest) -> DispatchOutcome {
        let mut state = DispatchState::Received;
        match self.run(request, &mut state).await {
            Ok(value) => DispatchOutcome::Submitted { value },
            Err(e) => {
                debug!(from = ?state, error = %e, "Dispatch transition to Failed");
                e.into()
            }
        }
    }

    async fn run(&self, request: &SignAndSubmitRequest, state: &mut DispatchState) -> Result<Value> {
        validate_contract_id(&request.contract_id)?;
        let keypair = Keypair::from_secret(&request.secret_key)?;

        let mut tx = assemble(
            TransactionInput::Xdr(request.transaction_xdr.clone()),
            &self.config.network_passphrase,
        )?;
        enter(state, DispatchState::Parsed);
        info!(
            contract = %request.contract_id,
            method = ?tx.method(),
            signer = %keypair.public_key(),
            "Dispatching transaction"
        );

        if let Err(e) = tx.simulate(self.rpc.as_ref()).await {
            warn!(error = %e, "Simulation failed, continuing as a write call");
        }
        enter(state, DispatchState::Simulated);

        if tx.is_read_call() {
            enter(state, DispatchState::ReadOnly);
            return self.submit_and_decode(&tx, state).await;
        }

        enter(state, DispatchState::ResolvingSigner);
        let resolved = resolve_signer(&tx);
        let tx = match resolved.wallet() {
            Some(wallet) => self.sign_for_wallet(tx, wallet, keypair).await?,
            None => self.sign_for_account(tx, &keypair).await?,
        };
        enter(state, DispatchState::Signed);

        self.submit_and_decode(&tx, state).await
    }

    async fn sign_for_wallet(
        &self,
        tx: AssembledTransaction,
        wallet_id: &str,
        keypair: Keypair,
    ) -> Result<AssembledTransaction> {
        debug!(wallet = %wallet_id, "Signing through contract wallet");
        let mut wallet = PasskeyWallet::new(wallet_id, &self.config, Arc::clone(&self.rpc))?;
        if let Some(authenticator) = &self.authenticator {
            wallet = wallet.with_authenticator(Arc::clone(authenticator));
        }
        // The relay sponsors the envelope, so only the auth entries are signed
        wallet
            .sign(TransactionInput::Assembled(tx), &SignOptions::with_keypair(keypair))
            .await
    }

    async fn sign_for_account(
        &self,
        mut tx: AssembledTransaction,
        keypair: &Keypair,
    ) -> Result<AssembledTransaction> {
        let latest = self.rpc.latest_ledger().await?;
        let valid_until = latest.sequence.saturating_add(KEYPAIR_VALIDITY_LEDGERS);
        let address = keypair.public_key();

        let mut signed = 0usize;
        let mut entries = Vec::new();
        for entry in tx.auth_entries() {
            let ours = match &entry.credentials {
                SorobanCredentials::Address(creds) => sc_address_to_strkey(&creds.address) == address,
                SorobanCredentials::SourceAccount => false,
            };
            if ours {
                entries.push(authorize_entry(
                    &entry,
                    keypair,
                    valid_until,
                    &self.config.network_passphrase,
                )?);
                signed += 1;
            } else {
                entries.push(entry);
            }
        }
        if signed > 0 {
            tx.set_auth_entries(entries)?;
        }
        debug!(entries = signed, valid_until, "Account authorization signed");

        tx.sign(keypair)?;
        Ok(tx)
    }

    async fn submit_and_decode(
        &self,
        tx: &AssembledTransaction,
        state: &mut DispatchState,
    ) -> Result<Value> {
        let response = self.relay.submit(&tx.to_xdr()?, None).await?;
        enter(state, DispatchState::Submitted);

        let value = decode_return_value(response.result_meta_xdr()?)?;
        enter(state, DispatchState::Decoded);
        info!("Transaction applied");
        Ok(value)
    }
}

impl From<Error> for DispatchOutcome {
    fn from(e: Error) -> Self {
        if e.is_authorization_denied() {
            DispatchOutcome::PermissionDenied { detail: e.details() }
        } else {
            DispatchOutcome::Failed {
                message: e.to_string(),
                details: e.details(),
            }
        }
    }
}

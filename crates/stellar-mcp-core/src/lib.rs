//! Stellar MCP Core - Soroban signing pipeline
//!
//! This crate turns a contract-invocation transaction into an applied ledger
//! result: it simulates, works out who has to authorize, signs either as a
//! classic account or through a passkey smart wallet, submits through a
//! fee-sponsoring relay and decodes the contract's return value.

pub mod address;
pub mod assembled;
pub mod auth;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod faucet;
pub mod horizon;
pub mod indexer;
pub mod keypair;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod passkey;
pub mod relay;
pub mod resolver;
pub mod rpc;
pub mod scval;
pub mod signer;
pub mod webauthn;

#[cfg(test)]
mod testutil;

pub use address::{validate_contract_id, STRKEY_LEN};
pub use assembled::{assemble, AssembledTransaction, TransactionInput};
pub use auth::{authorize_entry, default_expiration, network_id};
pub use config::{Config, LaunchtubeConfig, MercuryConfig, ResourcePaths, TESTNET_PASSPHRASE};
pub use decoder::{decode_return_value, sc_val_to_json};
pub use dispatcher::{DispatchOutcome, Dispatcher, SignAndSubmitRequest};
pub use error::{Error, Result};
pub use faucet::FriendbotClient;
pub use horizon::{AccountSummary, HorizonClient};
pub use indexer::{MercuryClient, SignerQuery};
pub use keypair::Keypair;
pub use passkey::{PasskeyWallet, SignOptions};
pub use relay::{LaunchtubeClient, Relay, RelayResponse};
pub use resolver::{resolve_signer, ResolvedSigner};
pub use rpc::{RpcClient, SimulationResult, SorobanRpc};
pub use signer::{SignerEntry, SignerKey, SignerProof};
pub use webauthn::{Authenticator, CeremonySession};

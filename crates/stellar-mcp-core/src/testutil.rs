//! Infallible fixture wrappers for unit tests

use stellar_xdr::curr::{SorobanAuthorizationEntry, TransactionEnvelope};

use crate::keypair::Keypair;
use crate::mock;

pub(crate) fn invoke_envelope(
    source: &Keypair,
    auth: Vec<SorobanAuthorizationEntry>,
) -> TransactionEnvelope {
    mock::contract_call_envelope(source, auth).unwrap()
}

pub(crate) fn transfer_entry(address: &str, nonce: i64) -> SorobanAuthorizationEntry {
    mock::address_auth_entry(address, nonce).unwrap()
}

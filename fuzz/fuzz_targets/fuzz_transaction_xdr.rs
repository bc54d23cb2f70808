#![no_main]

use libfuzzer_sys::fuzz_target;
use stellar_mcp_core::{assemble, TransactionInput, TESTNET_PASSPHRASE};
use stellar_xdr::curr::{Limits, ReadXdr, TransactionEnvelope};

fuzz_target!(|data: &[u8]| {
    // Raw envelope bytes
    if let Ok(envelope) = TransactionEnvelope::from_xdr(data, Limits::len(data.len())) {
        if let Ok(tx) = assemble(TransactionInput::Envelope(envelope), TESTNET_PASSPHRASE) {
            let xdr = tx.to_xdr().unwrap();
            let again = assemble(TransactionInput::Xdr(xdr), TESTNET_PASSPHRASE).unwrap();
            assert_eq!(tx.auth_entries(), again.auth_entries());
            assert_eq!(tx.source_account(), again.source_account());
            let _ = tx.hash();
        }
    }

    // Arbitrary text as base64 input; must fail cleanly
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(tx) = assemble(TransactionInput::Xdr(text.to_string()), TESTNET_PASSPHRASE) {
            assert!(!tx.is_read_call());
            let _ = tx.needs_non_invoker_signing_by(true);
        }
    }
});

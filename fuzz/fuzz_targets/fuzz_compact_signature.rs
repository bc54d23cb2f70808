#![no_main]

use libfuzzer_sys::fuzz_target;
use p256::ecdsa::Signature;
use stellar_mcp_core::webauthn::compact_signature;

fuzz_target!(|data: &[u8]| {
    if let Ok(compact) = compact_signature(data) {
        let sig = Signature::from_slice(&compact).unwrap();
        // Already low-S, so normalizing is a no-op
        assert!(sig.normalize_s().is_none());

        // Compacting the re-encoded signature is stable
        let der = sig.to_der();
        assert_eq!(compact_signature(der.as_bytes()).unwrap(), compact);
    }
});

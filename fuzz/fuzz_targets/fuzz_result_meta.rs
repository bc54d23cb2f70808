#![no_main]

use base64::{engine::general_purpose::STANDARD, Engine};
use libfuzzer_sys::fuzz_target;
use stellar_mcp_core::decode_return_value;

fuzz_target!(|data: &[u8]| {
    // Should never panic, whatever the relay sends back
    let _ = decode_return_value(&STANDARD.encode(data));

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = decode_return_value(text);
    }
});

//! Contract return value decoding
//!
//! Turns the return value carried in a transaction's result meta into plain
//! JSON. Integers wider than 64 bits become decimal strings so no precision
//! is lost.

use alloy_primitives::{I256, U256};
use serde_json::{json, Map, Value};
use stellar_xdr::curr::{Limits, ReadXdr, ScError, ScVal, TransactionMeta, WriteXdr};

use crate::address::sc_address_to_strkey;
use crate::error::{Error, Result};

/// Extract and convert the Soroban return value of an applied transaction
pub fn decode_return_value(result_meta_xdr: &str) -> Result<Value> {
    let meta = TransactionMeta::from_xdr_base64(result_meta_xdr.trim(), Limits::none())?;
    let value = match meta {
        TransactionMeta::V3(v3) => v3.soroban_meta.map(|soroban| soroban.return_value),
        TransactionMeta::V4(v4) => v4.soroban_meta.and_then(|soroban| soroban.return_value),
        _ => None,
    };

    let value = value.ok_or_else(|| {
        Error::UnsupportedState("Transaction meta has no Soroban return value".to_string())
    })?;
    sc_val_to_json(&value)
}

pub fn sc_val_to_json(value: &ScVal) -> Result<Value> {
    Ok(match value {
        ScVal::Void => Value::Null,
        ScVal::Bool(b) => Value::Bool(*b),
        ScVal::U32(n) => json!(n),
        ScVal::I32(n) => json!(n),
        ScVal::U64(n) => json!(n),
        ScVal::I64(n) => json!(n),
        ScVal::Timepoint(t) => json!(t.0),
        ScVal::Duration(d) => json!(d.0),
        ScVal::U128(parts) => {
            Value::String((((parts.hi as u128) << 64) | parts.lo as u128).to_string())
        }
        ScVal::I128(parts) => {
            Value::String((((parts.hi as i128) << 64) | parts.lo as i128).to_string())
        }
        ScVal::U256(parts) => Value::String(
            U256::from_limbs([parts.lo_lo, parts.lo_hi, parts.hi_lo, parts.hi_hi]).to_string(),
        ),
        ScVal::I256(parts) => Value::String(
            I256::from_raw(U256::from_limbs([
                parts.lo_lo,
                parts.lo_hi,
                parts.hi_lo,
                parts.hi_hi as u64,
            ]))
            .to_string(),
        ),
        ScVal::Bytes(bytes) => Value::String(hex::encode(bytes.0.as_slice())),
        ScVal::String(s) => Value::String(s.0.to_utf8_string_lossy()),
        ScVal::Symbol(s) => Value::String(s.0.to_utf8_string_lossy()),
        ScVal::Address(address) => Value::String(sc_address_to_strkey(address)),
        ScVal::Vec(None) | ScVal::Map(None) => Value::Null,
        ScVal::Vec(Some(items)) => Value::Array(
            items
                .0
                .iter()
                .map(sc_val_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        ScVal::Map(Some(map)) => {
            let string_keys = map
                .0
                .iter()
                .all(|entry| matches!(entry.key, ScVal::Symbol(_) | ScVal::String(_)));
            if string_keys {
                let mut object = Map::new();
                for entry in map.0.iter() {
                    let Value::String(key) = sc_val_to_json(&entry.key)? else {
                        continue;
                    };
                    object.insert(key, sc_val_to_json(&entry.val)?);
                }
                Value::Object(object)
            } else {
                Value::Array(
                    map.0
                        .iter()
                        .map(|entry| {
                            Ok(json!([sc_val_to_json(&entry.key)?, sc_val_to_json(&entry.val)?]))
                        })
                        .collect::<Result<Vec<_>>>()?,
                )
            }
        }
        ScVal::Error(error) => error_to_json(error),
        // Ledger-internal values; reported as raw XDR
        other => Value::String(other.to_xdr_base64(Limits::none())?),
    })
}

fn error_to_json(error: &ScError) -> Value {
    match error {
        ScError::Contract(code) => json!({ "error": "Contract", "code": code }),
        ScError::WasmVm(code) => json!({ "error": "WasmVm", "code": *code as i32 }),
        ScError::Context(code) => json!({ "error": "Context", "code": *code as i32 }),
        ScError::Storage(code) => json!({ "error": "Storage", "code": *code as i32 }),
        ScError::Object(code) => json!({ "error": "Object", "code": *code as i32 }),
        ScError::Crypto(code) => json!({ "error": "Crypto", "code": *code as i32 }),
        ScError::Events(code) => json!({ "error": "Events", "code": *code as i32 }),
        ScError::Budget(code) => json!({ "error": "Budget", "code": *code as i32 }),
        ScError::Value(code) => json!({ "error": "Value", "code": *code as i32 }),
        ScError::Auth(code) => json!({ "error": "Auth", "code": *code as i32 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::transaction_meta_v3;
    use crate::scval;
    use stellar_xdr::curr::{
        Int128Parts, Int256Parts, ScErrorCode, UInt128Parts, UInt256Parts,
    };

    #[test]
    fn test_decode_from_meta() {
        let meta = transaction_meta_v3(ScVal::U32(42)).unwrap();
        assert_eq!(decode_return_value(&meta).unwrap(), json!(42));
    }

    #[test]
    fn test_garbage_meta() {
        assert!(decode_return_value("AAAA").is_err());
    }

    #[test]
    fn test_wide_integers_are_decimal_strings() {
        let i128_min = ScVal::I128(Int128Parts {
            hi: i64::MIN,
            lo: 0,
        });
        assert_eq!(sc_val_to_json(&i128_min).unwrap(), json!(i128::MIN.to_string()));

        let u128_val = ScVal::U128(UInt128Parts { hi: 1, lo: 5 });
        assert_eq!(
            sc_val_to_json(&u128_val).unwrap(),
            json!(((1u128 << 64) + 5).to_string())
        );

        let minus_one = ScVal::I256(Int256Parts {
            hi_hi: -1,
            hi_lo: u64::MAX,
            lo_hi: u64::MAX,
            lo_lo: u64::MAX,
        });
        assert_eq!(sc_val_to_json(&minus_one).unwrap(), json!("-1"));

        let two_pow_192 = ScVal::U256(UInt256Parts {
            hi_hi: 1,
            hi_lo: 0,
            lo_hi: 0,
            lo_lo: 0,
        });
        assert_eq!(
            sc_val_to_json(&two_pow_192).unwrap(),
            json!("6277101735386680763835789423207666416102355444464034512896")
        );
    }

    #[test]
    fn test_map_with_symbol_keys_is_object() {
        let value = scval::symbol_map(vec![
            ("amount", ScVal::I64(-5)),
            ("memo", scval::bytes(&[0xab, 0xcd]).unwrap()),
        ])
        .unwrap();
        assert_eq!(
            sc_val_to_json(&value).unwrap(),
            json!({ "amount": -5, "memo": "abcd" })
        );
    }

    #[test]
    fn test_map_with_other_keys_is_pairs() {
        let value = scval::map(vec![stellar_xdr::curr::ScMapEntry {
            key: ScVal::U32(1),
            val: ScVal::Bool(true),
        }])
        .unwrap();
        assert_eq!(sc_val_to_json(&value).unwrap(), json!([[1, true]]));
    }

    #[test]
    fn test_error_value() {
        let value = ScVal::Error(ScError::Auth(ScErrorCode::InvalidAction));
        let json = sc_val_to_json(&value).unwrap();
        assert_eq!(json["error"], "Auth");
    }

    #[test]
    fn test_void_and_address() {
        assert_eq!(sc_val_to_json(&ScVal::Void).unwrap(), Value::Null);
        let contract = stellar_strkey::Contract([3u8; 32]).to_string();
        let address = ScVal::Address(crate::address::parse_sc_address(&contract).unwrap());
        assert_eq!(sc_val_to_json(&address).unwrap(), json!(contract));
    }
}

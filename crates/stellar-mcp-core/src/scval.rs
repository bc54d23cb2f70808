//! Small constructors for Soroban values

use stellar_xdr::curr::{ScBytes, ScMap, ScMapEntry, ScSymbol, ScVal, ScVec};

use crate::error::Result;

pub fn symbol(name: &str) -> Result<ScVal> {
    Ok(ScVal::Symbol(ScSymbol::try_from(name.as_bytes().to_vec())?))
}

pub fn bytes(data: &[u8]) -> Result<ScVal> {
    Ok(ScVal::Bytes(ScBytes::try_from(data.to_vec())?))
}

pub fn vec(items: Vec<ScVal>) -> Result<ScVal> {
    Ok(ScVal::Vec(Some(ScVec::try_from(items)?)))
}

pub fn map(entries: Vec<ScMapEntry>) -> Result<ScVal> {
    Ok(ScVal::Map(Some(ScMap::try_from(entries)?)))
}

/// Map keyed by symbols, in the given order
pub fn symbol_map(fields: Vec<(&str, ScVal)>) -> Result<ScVal> {
    let entries = fields
        .into_iter()
        .map(|(name, val)| {
            Ok(ScMapEntry {
                key: symbol(name)?,
                val,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    map(entries)
}

//! Passkey wallet signer keys, proofs and the signature map
//!
//! A wallet authorization carries `Vec[Map{SignerKey => Signature}]`. Each
//! key and proof is encoded as the wallet contract's tagged union,
//! `Vec[Symbol(tag), value...]`. The verifying contract walks the map in
//! canonical order, so every insertion re-sorts the whole map.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{Limits, ScMapEntry, ScVal, WriteXdr};

use crate::address::parse_sc_address;
use crate::error::{Error, Result};
use crate::scval;

/// Identity of a wallet signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerKey {
    /// Raw Ed25519 public key
    Ed25519([u8; 32]),
    /// WebAuthn credential id
    Secp256r1(Vec<u8>),
    /// Policy contract address (`C...`)
    Policy(String),
}

impl SignerKey {
    pub fn tag(&self) -> &'static str {
        match self {
            SignerKey::Ed25519(_) => "Ed25519",
            SignerKey::Secp256r1(_) => "Secp256r1",
            SignerKey::Policy(_) => "Policy",
        }
    }

    fn value(&self) -> Result<ScVal> {
        match self {
            SignerKey::Ed25519(pk) => scval::bytes(pk),
            SignerKey::Secp256r1(id) => scval::bytes(id),
            SignerKey::Policy(address) => Ok(ScVal::Address(parse_sc_address(address)?)),
        }
    }

    pub fn to_sc_val(&self) -> Result<ScVal> {
        scval::vec(vec![scval::symbol(self.tag())?, self.value()?])
    }
}

/// Assertion material returned by a WebAuthn ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthnProof {
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    /// Compact `r || s`, low-S normalized
    pub signature: [u8; 64],
}

/// Evidence that a signer approved the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerProof {
    Ed25519([u8; 64]),
    Secp256r1(WebAuthnProof),
    /// The policy contract authorizes itself at execution time
    Policy,
}

impl SignerProof {
    pub fn tag(&self) -> &'static str {
        match self {
            SignerProof::Ed25519(_) => "Ed25519",
            SignerProof::Secp256r1(_) => "Secp256r1",
            SignerProof::Policy => "Policy",
        }
    }

    pub fn to_sc_val(&self) -> Result<ScVal> {
        let tag = scval::symbol(self.tag())?;
        match self {
            SignerProof::Ed25519(sig) => scval::vec(vec![tag, scval::bytes(sig)?]),
            SignerProof::Secp256r1(proof) => {
                // Field order is the contract's sorted struct layout
                let fields = scval::symbol_map(vec![
                    ("authenticator_data", scval::bytes(&proof.authenticator_data)?),
                    ("client_data_json", scval::bytes(&proof.client_data_json)?),
                    ("signature", scval::bytes(&proof.signature)?),
                ])?;
                scval::vec(vec![tag, fields])
            }
            SignerProof::Policy => scval::vec(vec![tag]),
        }
    }
}

/// Ordering key of an encoded signer key: tag bytes, then the value's XDR
pub fn signer_sort_key(key: &ScVal) -> Result<Vec<u8>> {
    let parts = match key {
        ScVal::Vec(Some(parts)) if parts.0.len() >= 2 => parts,
        _ => {
            return Err(Error::UnsupportedState(
                "Signer key is not a tagged value".to_string(),
            ))
        }
    };
    let tag = match &parts.0[0] {
        ScVal::Symbol(sym) => sym.0.to_utf8_string_lossy(),
        _ => {
            return Err(Error::UnsupportedState(
                "Signer key tag is not a symbol".to_string(),
            ))
        }
    };

    let mut out = tag.into_bytes();
    out.extend(parts.0[1].to_xdr(Limits::none())?);
    Ok(out)
}

/// Insert `{key => proof}` into an authorization signature.
///
/// `Void` becomes a one-entry map. An existing map gains the entry (replacing
/// one with an identical key) and is re-sorted. Any other shape is rejected.
pub fn insert_signature(signature: &mut ScVal, key: &SignerKey, proof: &SignerProof) -> Result<()> {
    let entry = ScMapEntry {
        key: key.to_sc_val()?,
        val: proof.to_sc_val()?,
    };

    match signature {
        ScVal::Void => {
            *signature = scval::vec(vec![scval::map(vec![entry])?])?;
            Ok(())
        }
        ScVal::Vec(Some(outer)) => {
            let mut items = outer.0.to_vec();
            let existing = match items.first() {
                Some(ScVal::Map(Some(map))) => map.0.to_vec(),
                Some(ScVal::Map(None)) => Vec::new(),
                _ => return Err(Error::UnsupportedState("Unsupported signature".to_string())),
            };

            let mut entries: Vec<ScMapEntry> = existing
                .into_iter()
                .filter(|e| e.key != entry.key)
                .collect();
            entries.push(entry);

            let mut keyed = entries
                .into_iter()
                .map(|e| Ok((signer_sort_key(&e.key)?, e)))
                .collect::<Result<Vec<_>>>()?;
            keyed.sort_by(|a, b| a.0.cmp(&b.0));

            items[0] = scval::map(keyed.into_iter().map(|(_, e)| e).collect())?;
            *signature = scval::vec(items)?;
            Ok(())
        }
        _ => Err(Error::UnsupportedState("Unsupported signature".to_string())),
    }
}

/// Keys currently present in a wallet signature, in stored order
pub fn signature_keys(signature: &ScVal) -> Vec<ScVal> {
    match signature {
        ScVal::Vec(Some(outer)) => match outer.0.first() {
            Some(ScVal::Map(Some(map))) => map.0.iter().map(|e| e.key.clone()).collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ============================================================================
// Indexed signers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerKind {
    Secp256r1,
    Ed25519,
    Policy,
}

/// Ledger storage class of a signer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerStorage {
    Persistent,
    Temporary,
}

/// A wallet signer as reported by the indexing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerEntry {
    pub kind: SignerKind,
    /// Credential id (base64url), account or policy address
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u32>,
    pub storage: SignerStorage,
    /// Set when a temporary signer is no longer in ledger state
    #[serde(default)]
    pub evicted: bool,
}

impl SignerEntry {
    /// Raw bytes of the signer key as stored in contract data
    pub fn key_bytes(&self) -> Result<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(self.key.trim_end_matches('='))
            .map_err(|e| Error::Parse(format!("Invalid signer key encoding: {}", e)))
    }
}

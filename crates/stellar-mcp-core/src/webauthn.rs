//! WebAuthn authentication ceremonies
//!
//! The authenticator itself (browser, platform key, hardware token) lives
//! behind the [`Authenticator`] trait. [`CeremonySession`] guarantees that at
//! most one ceremony is in flight per session: starting a new one aborts the
//! previous one, which resolves to [`Error::CeremonyAborted`].

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::Signature;
use p256::elliptic_curve::PrimeField;
use p256::Scalar;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::debug;

use crate::error::{Error, Result};

/// Credential filter entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    /// base64url credential id
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CredentialDescriptor {
    pub fn public_key(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "public-key".to_string(),
        }
    }
}

/// Options for `navigator.credentials.get`-style assertions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    /// base64url (unpadded) challenge
    pub challenge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    /// Empty means any discoverable credential
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: String,
}

impl AuthenticationOptions {
    pub fn for_payload(payload: &[u8], rp_id: Option<String>) -> Self {
        Self {
            challenge: URL_SAFE_NO_PAD.encode(payload),
            rp_id,
            allow_credentials: Vec::new(),
            user_verification: "preferred".to_string(),
        }
    }

    pub fn allow(mut self, credential_id: impl Into<String>) -> Self {
        self.allow_credentials
            .push(CredentialDescriptor::public_key(credential_id));
        self
    }
}

/// Decoded assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    /// base64url credential id
    pub id: String,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    /// DER-encoded ECDSA P-256 signature
    pub signature: Vec<u8>,
}

impl AuthenticationResponse {
    pub fn credential_id(&self) -> Result<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(self.id.trim_end_matches('='))
            .map_err(|e| Error::Parse(format!("Invalid credential id: {}", e)))
    }
}

/// Performs WebAuthn assertions
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn start_authentication(
        &self,
        options: AuthenticationOptions,
    ) -> Result<AuthenticationResponse>;
}

/// Single-flight ceremony slot
#[derive(Default)]
pub struct CeremonySession {
    current: Mutex<Option<Arc<Notify>>>,
}

impl CeremonySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a ceremony, aborting whichever one this session had in flight
    pub async fn authenticate(
        &self,
        authenticator: &dyn Authenticator,
        options: AuthenticationOptions,
    ) -> Result<AuthenticationResponse> {
        let abort = self.begin();

        let result = tokio::select! {
            res = authenticator.start_authentication(options) => res,
            _ = abort.notified() => {
                debug!("Ceremony superseded by a newer one");
                Err(Error::CeremonyAborted)
            }
        };

        self.finish(&abort);
        result
    }

    fn begin(&self) -> Arc<Notify> {
        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.notify_one();
        }
        let abort = Arc::new(Notify::new());
        *slot = Some(Arc::clone(&abort));
        abort
    }

    fn finish(&self, abort: &Arc<Notify>) {
        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, abort)) {
            *slot = None;
        }
    }
}

/// Convert a DER ECDSA signature to the 64-byte `r || s` form the wallet
/// contract verifies, with `s` normalized to the lower half of the order.
pub fn compact_signature(der: &[u8]) -> Result<[u8; 64]> {
    let signature = Signature::from_der(der)
        .map_err(|e| Error::Crypto(format!("Invalid DER signature: {}", e)))?;
    let bytes = signature.to_bytes();

    let mut s = [0u8; 32];
    s.copy_from_slice(&bytes[32..]);

    let mut out = [0u8; 64];
    out[..32].copy_from_slice(&bytes[..32]);
    out[32..].copy_from_slice(&normalize_s_low(s)?);
    Ok(out)
}

fn normalize_s_low(s: [u8; 32]) -> Result<[u8; 32]> {
    // P-256 order / 2 (big-endian)
    const HALF_ORDER: [u8; 32] = [
        0x7F, 0xFF, 0xFF, 0xFF, 0x80, 0x00, 0x00, 0x00, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xDE, 0x73, 0x7D, 0x56, 0xD3, 0x8B, 0xCF, 0x42, 0x79, 0xDC, 0xE5, 0x61, 0x7E, 0x31,
        0x92, 0xA8,
    ];

    if s <= HALF_ORDER {
        return Ok(s);
    }

    let scalar = Option::<Scalar>::from(Scalar::from_repr(s.into()))
        .ok_or_else(|| Error::Crypto("Signature s out of range".to_string()))?;
    Ok((-scalar).to_repr().into())
}

//! Ed25519 account keypairs

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;
use std::fmt;
use stellar_xdr::curr::{
    AccountId, DecoratedSignature, MuxedAccount, PublicKey as XdrPublicKey, ScAddress,
    Signature, SignatureHint, Uint256,
};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// A keypair controlling a classic Stellar account
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build from a raw 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse an `S...` secret seed
    pub fn from_secret(secret: &str) -> Result<Self> {
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(secret.trim())
            .map_err(|_| Error::InvalidArgument("Invalid secret key".to_string()))?;
        let seed = Zeroizing::new(seed.0);
        Ok(Self::from_seed(&seed))
    }

    /// `G...` account address
    pub fn public_key(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.raw_public_key()).to_string()
    }

    /// `S...` secret seed
    pub fn secret(&self) -> String {
        stellar_strkey::ed25519::PrivateKey(self.signing_key.to_bytes()).to_string()
    }

    pub fn raw_public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.signing_key.sign(payload).to_bytes()
    }

    pub fn verify(&self, payload: &[u8], signature: &[u8; 64]) -> bool {
        let signature = DalekSignature::from_bytes(signature);
        self.signing_key
            .verifying_key()
            .verify(payload, &signature)
            .is_ok()
    }

    /// Last four bytes of the public key
    pub fn signature_hint(&self) -> SignatureHint {
        let pk = self.raw_public_key();
        SignatureHint([pk[28], pk[29], pk[30], pk[31]])
    }

    /// Sign a transaction hash for the envelope signature list
    pub fn sign_decorated(&self, tx_hash: &[u8; 32]) -> Result<DecoratedSignature> {
        let signature = self.sign(tx_hash);
        Ok(DecoratedSignature {
            hint: self.signature_hint(),
            signature: Signature(signature.to_vec().try_into()?),
        })
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(XdrPublicKey::PublicKeyTypeEd25519(Uint256(
            self.raw_public_key(),
        )))
    }

    pub fn muxed_account(&self) -> MuxedAccount {
        MuxedAccount::Ed25519(Uint256(self.raw_public_key()))
    }

    pub fn sc_address(&self) -> ScAddress {
        ScAddress::Account(self.account_id())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_round_trip() {
        let keypair = Keypair::random();
        let restored = Keypair::from_secret(&keypair.secret()).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
        assert!(keypair.public_key().starts_with('G'));
        assert!(keypair.secret().starts_with('S'));
        assert_eq!(keypair.public_key().len(), 56);
    }

    #[test]
    fn test_invalid_secret() {
        assert!(matches!(
            Keypair::from_secret("not-a-secret"),
            Err(Error::InvalidArgument(_))
        ));
        let public = Keypair::random().public_key();
        assert!(Keypair::from_secret(&public).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::from_seed(&[7u8; 32]);
        let sig = keypair.sign(b"payload");
        assert!(keypair.verify(b"payload", &sig));
        assert!(!keypair.verify(b"other", &sig));
    }

    #[test]
    fn test_signature_hint() {
        let keypair = Keypair::from_seed(&[9u8; 32]);
        let pk = keypair.raw_public_key();
        assert_eq!(keypair.signature_hint().0, pk[28..32]);
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Keypair::random();
        let debug = format!("{:?}", keypair);
        assert!(!debug.contains(&keypair.secret()));
    }
}

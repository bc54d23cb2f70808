//! Passkey smart-wallet signing
//!
//! A [`PasskeyWallet`] authorizes Soroban invocations on behalf of a wallet
//! contract. Each authorization entry addressed to the wallet gets one
//! `{SignerKey => SignerProof}` pair merged into its signature map; the proof
//! comes from one of three paths:
//!
//! - **Passkey** (default): a WebAuthn assertion over the payload, compacted
//!   to `r || s` with low-S normalization
//! - **Keypair**: a plain Ed25519 signature
//! - **Policy**: no signature; the policy contract is consulted on-chain

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use stellar_xdr::curr::{SorobanAuthorizationEntry, SorobanCredentials};
use tracing::{debug, info, warn};

use crate::address::{sc_address_to_strkey, validate_contract_id};
use crate::assembled::{assemble, AssembledTransaction, TransactionInput};
use crate::auth::{address_credentials_mut, authorization_payload, default_expiration, network_id};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::keypair::Keypair;
use crate::rpc::SorobanRpc;
use crate::signer::{insert_signature, SignerKey, SignerProof, WebAuthnProof};
use crate::webauthn::{compact_signature, AuthenticationOptions, Authenticator, CeremonySession};

/// `key_id` value that lets the authenticator pick any credential
pub const ANY_CREDENTIAL: &str = "any";

/// Per-call signing options
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// WebAuthn relying party id
    pub rp_id: Option<String>,
    /// base64url credential id, or [`ANY_CREDENTIAL`]
    pub key_id: Option<String>,
    pub keypair: Option<Keypair>,
    /// Policy contract address
    pub policy: Option<String>,
    /// Signature expiration ledger
    pub expiration: Option<u32>,
}

impl SignOptions {
    pub fn with_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Some(keypair),
            ..Self::default()
        }
    }

    pub fn with_key_id(key_id: impl Into<String>) -> Self {
        Self {
            key_id: Some(key_id.into()),
            ..Self::default()
        }
    }

    pub fn with_policy(policy: impl Into<String>) -> Self {
        Self {
            policy: Some(policy.into()),
            ..Self::default()
        }
    }

    pub fn rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = Some(rp_id.into());
        self
    }

    pub fn expiration(mut self, ledger: u32) -> Self {
        self.expiration = Some(ledger);
        self
    }

    fn path(&self) -> Result<SigningPath<'_>> {
        match (&self.key_id, &self.keypair, &self.policy) {
            (_, None, None) => Ok(SigningPath::Passkey {
                key_id: self.key_id.as_deref(),
            }),
            (None, Some(keypair), None) => Ok(SigningPath::Keypair(keypair)),
            (None, None, Some(policy)) => Ok(SigningPath::Policy(policy)),
            _ => Err(Error::InvalidArgument(
                "Exactly one of key_id, keypair, or policy may be given".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SigningPath<'a> {
    Passkey { key_id: Option<&'a str> },
    Keypair(&'a Keypair),
    Policy(&'a str),
}

/// Signing adapter bound to one wallet contract
pub struct PasskeyWallet {
    contract_id: String,
    network_passphrase: String,
    default_timeout_secs: u32,
    rpc: Arc<dyn SorobanRpc>,
    authenticator: Option<Arc<dyn Authenticator>>,
    session: CeremonySession,
    /// Last credential used by a passkey ceremony
    key_id: Mutex<Option<String>>,
}

impl PasskeyWallet {
    pub fn new(contract_id: &str, config: &Config, rpc: Arc<dyn SorobanRpc>) -> Result<Self> {
        validate_contract_id(contract_id)?;
        Ok(Self {
            contract_id: contract_id.to_string(),
            network_passphrase: config.network_passphrase.clone(),
            default_timeout_secs: config.default_timeout_secs,
            rpc,
            authenticator: None,
            session: CeremonySession::new(),
            key_id: Mutex::new(None),
        })
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn key_id(&self) -> Option<String> {
        self.key_id.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_key_id(&self, key_id: Option<String>) {
        *self.key_id.lock().unwrap_or_else(|e| e.into_inner()) = key_id;
    }

    /// Sign a single authorization entry for this wallet
    pub async fn sign_auth_entry(
        &self,
        mut entry: SorobanAuthorizationEntry,
        options: &SignOptions,
    ) -> Result<SorobanAuthorizationEntry> {
        let path = options.path()?;

        let current = address_credentials_mut(&mut entry)?.signature_expiration_ledger;
        let expiration = match options.expiration.filter(|&ledger| ledger != 0) {
            Some(ledger) => ledger,
            None if current != 0 => current,
            None => {
                let latest = self.rpc.latest_ledger().await?;
                default_expiration(latest.sequence, self.default_timeout_secs)
            }
        };
        address_credentials_mut(&mut entry)?.signature_expiration_ledger = expiration;

        let payload = authorization_payload(&entry, &network_id(&self.network_passphrase))?;
        let (key, proof) = match path {
            SigningPath::Policy(policy) => (SignerKey::Policy(policy.to_string()), SignerProof::Policy),
            SigningPath::Keypair(keypair) => (
                SignerKey::Ed25519(keypair.raw_public_key()),
                SignerProof::Ed25519(keypair.sign(&payload)),
            ),
            SigningPath::Passkey { key_id } => {
                self.passkey_proof(&payload, options.rp_id.clone(), key_id)
                    .await?
            }
        };
        debug!(signer = key.tag(), expiration, "Authorization entry signed");

        insert_signature(&mut address_credentials_mut(&mut entry)?.signature, &key, &proof)?;
        Ok(entry)
    }

    async fn passkey_proof(
        &self,
        payload: &[u8; 32],
        rp_id: Option<String>,
        key_id: Option<&str>,
    ) -> Result<(SignerKey, SignerProof)> {
        let authenticator = self.authenticator.as_deref().ok_or_else(|| {
            Error::ServiceUnavailable("No WebAuthn authenticator configured".to_string())
        })?;

        let mut options = AuthenticationOptions::for_payload(payload, rp_id);
        let scoped = match key_id {
            Some(ANY_CREDENTIAL) => None,
            Some(id) => Some(id.to_string()),
            None => self.key_id(),
        };
        if let Some(id) = scoped {
            options = options.allow(id);
        }

        let response = self.session.authenticate(authenticator, options).await?;
        let credential_id = response.credential_id()?;
        let signature = compact_signature(&response.signature)?;
        self.set_key_id(Some(URL_SAFE_NO_PAD.encode(&credential_id)));

        Ok((
            SignerKey::Secp256r1(credential_id),
            SignerProof::Secp256r1(WebAuthnProof {
                authenticator_data: response.authenticator_data,
                client_data_json: response.client_data_json,
                signature,
            }),
        ))
    }

    /// Sign every authorization entry of `input` addressed to this wallet
    pub async fn sign(
        &self,
        input: TransactionInput,
        options: &SignOptions,
    ) -> Result<AssembledTransaction> {
        let mut tx = assemble(input, &self.network_passphrase)?;
        if tx.needs_simulation() {
            tx.simulate(self.rpc.as_ref()).await?;
        }

        let mut signed = 0usize;
        let mut entries = Vec::new();
        for entry in tx.auth_entries() {
            let addressed = match &entry.credentials {
                SorobanCredentials::Address(creds) => {
                    sc_address_to_strkey(&creds.address) == self.contract_id
                }
                SorobanCredentials::SourceAccount => false,
            };
            if addressed {
                entries.push(self.sign_auth_entry(entry, options).await?);
                signed += 1;
            } else {
                entries.push(entry);
            }
        }

        if signed == 0 {
            warn!(wallet = %self.contract_id, "No authorization entries addressed to wallet");
        } else {
            tx.set_auth_entries(entries)?;
            info!(wallet = %self.contract_id, entries = signed, "Wallet authorization signed");
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::address_credentials;
    use crate::mock::{MockAuthenticator, MockRpc};
    use crate::signer::signature_keys;
    use crate::testutil::transfer_entry;
    use stellar_xdr::curr::ScVal;

    fn wallet_id() -> String {
        stellar_strkey::Contract([7u8; 32]).to_string()
    }

    fn wallet(rpc: MockRpc) -> PasskeyWallet {
        PasskeyWallet::new(&wallet_id(), &Config::default(), Arc::new(rpc)).unwrap()
    }

    #[test]
    fn test_rejects_account_as_wallet() {
        let account = Keypair::from_seed(&[1u8; 32]).public_key();
        let result = PasskeyWallet::new(&account, &Config::default(), Arc::new(MockRpc::new()));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_conflicting_options() {
        let options = SignOptions {
            key_id: Some("abc".to_string()),
            keypair: Some(Keypair::from_seed(&[1u8; 32])),
            ..SignOptions::default()
        };
        let err = wallet(MockRpc::new())
            .sign_auth_entry(transfer_entry(&wallet_id(), 1), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_source_account_entry_unsupported() {
        let mut entry = transfer_entry(&wallet_id(), 1);
        entry.credentials = SorobanCredentials::SourceAccount;
        let err = wallet(MockRpc::new())
            .sign_auth_entry(entry, &SignOptions::with_policy(wallet_id()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedState(_)));
    }

    #[tokio::test]
    async fn test_expiration_defaults_from_latest_ledger() {
        let signed = wallet(MockRpc::new().with_latest_ledger(1000))
            .sign_auth_entry(
                transfer_entry(&wallet_id(), 1),
                &SignOptions::with_keypair(Keypair::from_seed(&[2u8; 32])),
            )
            .await
            .unwrap();
        assert_eq!(
            address_credentials(&signed).unwrap().signature_expiration_ledger,
            1060
        );
    }

    #[tokio::test]
    async fn test_existing_expiration_kept() {
        let mut entry = transfer_entry(&wallet_id(), 1);
        address_credentials_mut(&mut entry).unwrap().signature_expiration_ledger = 4242;
        let signed = wallet(MockRpc::new())
            .sign_auth_entry(entry, &SignOptions::with_policy(wallet_id()))
            .await
            .unwrap();
        assert_eq!(
            address_credentials(&signed).unwrap().signature_expiration_ledger,
            4242
        );
    }

    #[tokio::test]
    async fn test_zero_expiration_counts_as_unset() {
        let mut entry = transfer_entry(&wallet_id(), 1);
        address_credentials_mut(&mut entry).unwrap().signature_expiration_ledger = 4242;
        let signed = wallet(MockRpc::new())
            .sign_auth_entry(entry, &SignOptions::with_policy(wallet_id()).expiration(0))
            .await
            .unwrap();
        assert_eq!(
            address_credentials(&signed).unwrap().signature_expiration_ledger,
            4242
        );

        let signed = wallet(MockRpc::new().with_latest_ledger(1000))
            .sign_auth_entry(
                transfer_entry(&wallet_id(), 2),
                &SignOptions::with_policy(wallet_id()).expiration(0),
            )
            .await
            .unwrap();
        assert_eq!(
            address_credentials(&signed).unwrap().signature_expiration_ledger,
            1060
        );
    }

    #[tokio::test]
    async fn test_keypair_and_policy_merge_sorted() {
        let wallet = wallet(MockRpc::new());
        let keypair = Keypair::from_seed(&[3u8; 32]);
        let policy = stellar_strkey::Contract([9u8; 32]).to_string();

        let entry = wallet
            .sign_auth_entry(
                transfer_entry(&wallet_id(), 1),
                &SignOptions::with_policy(policy.clone()).expiration(500),
            )
            .await
            .unwrap();
        let entry = wallet
            .sign_auth_entry(entry, &SignOptions::with_keypair(keypair.clone()))
            .await
            .unwrap();

        let keys = signature_keys(&address_credentials(&entry).unwrap().signature);
        assert_eq!(
            keys,
            vec![
                SignerKey::Ed25519(keypair.raw_public_key()).to_sc_val().unwrap(),
                SignerKey::Policy(policy).to_sc_val().unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_passkey_without_authenticator() {
        let err = wallet(MockRpc::new())
            .sign_auth_entry(
                transfer_entry(&wallet_id(), 1),
                &SignOptions::default().expiration(10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_passkey_ceremony_scopes_and_remembers_credential() {
        let authenticator = Arc::new(MockAuthenticator::new(b"credential-1".to_vec(), [0x42; 32]));
        let wallet = wallet(MockRpc::new()).with_authenticator(authenticator.clone());

        let signed = wallet
            .sign_auth_entry(
                transfer_entry(&wallet_id(), 1),
                &SignOptions::default().rp_id("example.com").expiration(10),
            )
            .await
            .unwrap();

        let first = authenticator.last_options().unwrap();
        assert!(first.allow_credentials.is_empty());
        assert_eq!(first.rp_id.as_deref(), Some("example.com"));
        assert_eq!(wallet.key_id(), Some(URL_SAFE_NO_PAD.encode(b"credential-1")));

        let keys = signature_keys(&address_credentials(&signed).unwrap().signature);
        assert_eq!(
            keys,
            vec![SignerKey::Secp256r1(b"credential-1".to_vec()).to_sc_val().unwrap()]
        );

        wallet
            .sign_auth_entry(transfer_entry(&wallet_id(), 2), &SignOptions::default().expiration(10))
            .await
            .unwrap();
        let second = authenticator.last_options().unwrap();
        assert_eq!(second.allow_credentials.len(), 1);
        assert_eq!(second.allow_credentials[0].id, URL_SAFE_NO_PAD.encode(b"credential-1"));

        wallet
            .sign_auth_entry(
                transfer_entry(&wallet_id(), 3),
                &SignOptions::with_key_id(ANY_CREDENTIAL).expiration(10),
            )
            .await
            .unwrap();
        assert!(authenticator.last_options().unwrap().allow_credentials.is_empty());
    }

    #[tokio::test]
    async fn test_sign_only_touches_wallet_entries() {
        let account = Keypair::from_seed(&[4u8; 32]);
        let envelope = crate::testutil::invoke_envelope(
            &account,
            vec![
                transfer_entry(&account.public_key(), 1),
                transfer_entry(&wallet_id(), 2),
            ],
        );
        let signed = wallet(MockRpc::new())
            .sign(
                envelope.into(),
                &SignOptions::with_keypair(Keypair::from_seed(&[5u8; 32])).expiration(99),
            )
            .await
            .unwrap();

        let entries = signed.auth_entries();
        assert_eq!(address_credentials(&entries[0]).unwrap().signature, ScVal::Void);
        assert_ne!(address_credentials(&entries[1]).unwrap().signature, ScVal::Void);
    }
}

//! Soroban authorization entries
//!
//! An entry is signed over `sha256(XDR(HashIdPreimage::SorobanAuthorization))`,
//! which binds the network id, the credential nonce, the expiration ledger
//! and the authorized invocation tree.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Hash, HashIdPreimage, HashIdPreimageSorobanAuthorization, Limits, SorobanAddressCredentials,
    SorobanAuthorizationEntry, SorobanCredentials, WriteXdr,
};

use crate::error::{Error, Result};
use crate::keypair::Keypair;
use crate::scval;

/// Network id: the SHA-256 of the network passphrase
pub fn network_id(passphrase: &str) -> Hash {
    Hash(Sha256::digest(passphrase.as_bytes()).into())
}

/// Expiration ledger for a fresh signature.
///
/// Ledgers close roughly every five seconds, so the timeout is converted to
/// a ledger count.
pub fn default_expiration(latest_sequence: u32, timeout_secs: u32) -> u32 {
    latest_sequence.saturating_add(timeout_secs / 5)
}

pub fn address_credentials(entry: &SorobanAuthorizationEntry) -> Result<&SorobanAddressCredentials> {
    match &entry.credentials {
        SorobanCredentials::Address(creds) => Ok(creds),
        SorobanCredentials::SourceAccount => Err(Error::UnsupportedState(
            "Authorization entry uses source-account credentials".to_string(),
        )),
    }
}

pub fn address_credentials_mut(
    entry: &mut SorobanAuthorizationEntry,
) -> Result<&mut SorobanAddressCredentials> {
    match &mut entry.credentials {
        SorobanCredentials::Address(creds) => Ok(creds),
        SorobanCredentials::SourceAccount => Err(Error::UnsupportedState(
            "Authorization entry uses source-account credentials".to_string(),
        )),
    }
}

pub fn authorization_preimage(
    entry: &SorobanAuthorizationEntry,
    network_id: &Hash,
) -> Result<HashIdPreimage> {
    let creds = address_credentials(entry)?;
    Ok(HashIdPreimage::SorobanAuthorization(
        HashIdPreimageSorobanAuthorization {
            network_id: network_id.clone(),
            nonce: creds.nonce,
            signature_expiration_ledger: creds.signature_expiration_ledger,
            invocation: entry.root_invocation.clone(),
        },
    ))
}

/// 32-byte payload a signer must sign to authorize `entry`
pub fn authorization_payload(entry: &SorobanAuthorizationEntry, network_id: &Hash) -> Result<[u8; 32]> {
    let preimage = authorization_preimage(entry, network_id)?;
    Ok(Sha256::digest(preimage.to_xdr(Limits::none())?).into())
}

/// Sign an entry for a classic account.
///
/// Source-account entries are authorized by the envelope signature and come
/// back unchanged.
pub fn authorize_entry(
    entry: &SorobanAuthorizationEntry,
    keypair: &Keypair,
    valid_until_ledger: u32,
    network_passphrase: &str,
) -> Result<SorobanAuthorizationEntry> {
    if matches!(entry.credentials, SorobanCredentials::SourceAccount) {
        return Ok(entry.clone());
    }

    let mut signed = entry.clone();
    address_credentials_mut(&mut signed)?.signature_expiration_ledger = valid_until_ledger;

    let payload = authorization_payload(&signed, &network_id(network_passphrase))?;
    let signature = keypair.sign(&payload);
    if !keypair.verify(&payload, &signature) {
        return Err(Error::Crypto("Signature doesn't match payload".to_string()));
    }

    let sig_map = scval::symbol_map(vec![
        ("public_key", scval::bytes(&keypair.raw_public_key())?),
        ("signature", scval::bytes(&signature)?),
    ])?;
    address_credentials_mut(&mut signed)?.signature = scval::vec(vec![sig_map])?;

    Ok(signed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TESTNET_PASSPHRASE;
    use stellar_xdr::curr::{
        InvokeContractArgs, ScAddress, ScSymbol, ScVal, SorobanAuthorizedFunction,
        SorobanAuthorizedInvocation, VecM,
    };

    pub(crate) fn address_entry(address: ScAddress, nonce: i64, expiration: u32) -> SorobanAuthorizationEntry {
        SorobanAuthorizationEntry {
            credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                address: address.clone(),
                nonce,
                signature_expiration_ledger: expiration,
                signature: ScVal::Void,
            }),
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(InvokeContractArgs {
                    contract_address: address,
                    function_name: ScSymbol::try_from(b"transfer".to_vec()).unwrap(),
                    args: VecM::default(),
                }),
                sub_invocations: VecM::default(),
            },
        }
    }

    #[test]
    fn test_network_id_testnet() {
        assert_eq!(
            hex::encode(network_id(TESTNET_PASSPHRASE).0),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn test_default_expiration() {
        assert_eq!(default_expiration(1000, 300), 1060);
        assert_eq!(default_expiration(1000, 4), 1000);
        assert_eq!(default_expiration(u32::MAX, 300), u32::MAX);
    }

    #[test]
    fn test_payload_depends_on_expiration() {
        let keypair = Keypair::from_seed(&[1u8; 32]);
        let id = network_id(TESTNET_PASSPHRASE);
        let a = authorization_payload(&address_entry(keypair.sc_address(), 7, 100), &id).unwrap();
        let b = authorization_payload(&address_entry(keypair.sc_address(), 7, 101), &id).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorize_entry_signs_and_verifies() {
        let keypair = Keypair::from_seed(&[2u8; 32]);
        let entry = address_entry(keypair.sc_address(), 42, 0);

        let signed = authorize_entry(&entry, &keypair, 5000, TESTNET_PASSPHRASE).unwrap();
        let creds = address_credentials(&signed).unwrap();
        assert_eq!(creds.signature_expiration_ledger, 5000);

        let payload = authorization_payload(&signed, &network_id(TESTNET_PASSPHRASE)).unwrap();
        let ScVal::Vec(Some(outer)) = &creds.signature else {
            panic!("expected signature vector");
        };
        let ScVal::Map(Some(map)) = &outer.0[0] else {
            panic!("expected signature map");
        };
        let ScVal::Bytes(sig) = &map.0[1].val else {
            panic!("expected signature bytes");
        };
        let sig: [u8; 64] = sig.0.to_vec().try_into().unwrap();
        assert!(keypair.verify(&payload, &sig));
    }

    #[test]
    fn test_authorize_source_account_unchanged() {
        let keypair = Keypair::from_seed(&[3u8; 32]);
        let mut entry = address_entry(keypair.sc_address(), 1, 0);
        entry.credentials = SorobanCredentials::SourceAccount;
        let signed = authorize_entry(&entry, &keypair, 10, TESTNET_PASSPHRASE).unwrap();
        assert_eq!(signed, entry);
    }
}

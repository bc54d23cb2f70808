//! Strkey address helpers

use stellar_xdr::curr::{
    AccountId, ContractId, Hash, Limits, MuxedAccount, PublicKey as XdrPublicKey, ScAddress,
    Uint256, WriteXdr,
};

use crate::error::{Error, Result};

/// Length of every `G...` and `C...` strkey
pub const STRKEY_LEN: usize = 56;

/// Check a contract id before any network call is made
pub fn validate_contract_id(contract_id: &str) -> Result<()> {
    if !contract_id.starts_with('C') {
        return Err(Error::InvalidArgument(
            "Contract ID must start with \"C\"".to_string(),
        ));
    }
    if contract_id.len() != STRKEY_LEN {
        return Err(Error::InvalidArgument(
            "Contract ID must be 56 characters long".to_string(),
        ));
    }
    Ok(())
}

pub fn is_contract_id(address: &str) -> bool {
    validate_contract_id(address).is_ok()
}

/// Parse a `G...` account or `C...` contract address
pub fn parse_sc_address(address: &str) -> Result<ScAddress> {
    match stellar_strkey::Strkey::from_string(address) {
        Ok(stellar_strkey::Strkey::PublicKeyEd25519(pk)) => Ok(ScAddress::Account(AccountId(
            XdrPublicKey::PublicKeyTypeEd25519(Uint256(pk.0)),
        ))),
        Ok(stellar_strkey::Strkey::Contract(c)) => Ok(ScAddress::Contract(ContractId(Hash(c.0)))),
        _ => Err(Error::InvalidArgument(format!(
            "Unsupported address: {}",
            address
        ))),
    }
}

/// Render an address as a strkey; exotic kinds fall back to hex XDR
pub fn sc_address_to_strkey(address: &ScAddress) -> String {
    match address {
        ScAddress::Account(AccountId(XdrPublicKey::PublicKeyTypeEd25519(Uint256(pk)))) => {
            stellar_strkey::ed25519::PublicKey(*pk).to_string()
        }
        ScAddress::Contract(ContractId(Hash(bytes))) => {
            stellar_strkey::Contract(*bytes).to_string()
        }
        other => hex::encode(other.to_xdr(Limits::none()).unwrap_or_default()),
    }
}

pub fn muxed_account_to_strkey(account: &MuxedAccount) -> String {
    match account {
        MuxedAccount::Ed25519(Uint256(pk)) => stellar_strkey::ed25519::PublicKey(*pk).to_string(),
        MuxedAccount::MuxedEd25519(muxed) => stellar_strkey::ed25519::MuxedAccount {
            ed25519: muxed.ed25519.0,
            id: muxed.id,
        }
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

    #[test]
    fn test_validate_contract_id() {
        assert!(validate_contract_id(CONTRACT).is_ok());
    }

    #[test]
    fn test_contract_id_wrong_prefix() {
        let err = validate_contract_id("GDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: Contract ID must start with \"C\""
        );
    }

    #[test]
    fn test_contract_id_wrong_length() {
        let err = validate_contract_id("CABC").unwrap_err();
        assert!(err.to_string().contains("56 characters"));
    }

    #[test]
    fn test_contract_address_round_trip() {
        let address = parse_sc_address(CONTRACT).unwrap();
        assert!(matches!(address, ScAddress::Contract(_)));
        assert_eq!(sc_address_to_strkey(&address), CONTRACT);
    }

    #[test]
    fn test_account_address_round_trip() {
        let account = stellar_strkey::ed25519::PublicKey([3u8; 32]).to_string();
        let address = parse_sc_address(&account).unwrap();
        assert_eq!(sc_address_to_strkey(&address), account);
    }

    #[test]
    fn test_parse_rejects_secret() {
        let secret = stellar_strkey::ed25519::PrivateKey([1u8; 32]).to_string();
        assert!(parse_sc_address(&secret).is_err());
    }
}

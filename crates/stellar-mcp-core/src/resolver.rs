//! Wallet signer resolution

use tracing::{debug, warn};

use crate::address::is_contract_id;
use crate::assembled::AssembledTransaction;

/// Which signing path a transaction needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSigner {
    pub should_sign_with_signer: bool,
    /// Empty unless `should_sign_with_signer`
    pub wallet_contract_id: String,
}

impl ResolvedSigner {
    pub fn wallet(&self) -> Option<&str> {
        self.should_sign_with_signer
            .then_some(self.wallet_contract_id.as_str())
    }
}

/// Find the contract wallet, if any, that still has to authorize `tx`.
///
/// Only unsigned entries count. When several contract wallets are pending the
/// first one wins.
pub fn resolve_signer(tx: &AssembledTransaction) -> ResolvedSigner {
    let required = tx.needs_non_invoker_signing_by(false);
    let mut wallets = required.iter().filter(|address| is_contract_id(address));

    let Some(first) = wallets.next() else {
        debug!(required = required.len(), "No contract wallet among required signers");
        return ResolvedSigner::default();
    };

    let others: Vec<&String> = wallets.collect();
    if !others.is_empty() {
        warn!(
            wallet = %first,
            ignored = ?others,
            "Several contract wallets must sign; only the first is handled"
        );
    }

    ResolvedSigner {
        should_sign_with_signer: true,
        wallet_contract_id: first.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TESTNET_PASSPHRASE;
    use crate::keypair::Keypair;
    use crate::testutil::{invoke_envelope, transfer_entry};

    fn assembled(entries: Vec<stellar_xdr::curr::SorobanAuthorizationEntry>) -> AssembledTransaction {
        let keypair = Keypair::from_seed(&[1u8; 32]);
        AssembledTransaction::from_envelope(invoke_envelope(&keypair, entries), TESTNET_PASSPHRASE)
            .unwrap()
    }

    #[test]
    fn test_no_entries() {
        let resolved = resolve_signer(&assembled(vec![]));
        assert!(!resolved.should_sign_with_signer);
        assert_eq!(resolved.wallet_contract_id, "");
        assert_eq!(resolved.wallet(), None);
    }

    #[test]
    fn test_account_only() {
        let account = Keypair::from_seed(&[2u8; 32]).public_key();
        let resolved = resolve_signer(&assembled(vec![transfer_entry(&account, 1)]));
        assert_eq!(resolved, ResolvedSigner::default());
    }

    #[test]
    fn test_single_wallet() {
        let account = Keypair::from_seed(&[2u8; 32]).public_key();
        let wallet = stellar_strkey::Contract([7u8; 32]).to_string();
        let resolved = resolve_signer(&assembled(vec![
            transfer_entry(&account, 1),
            transfer_entry(&wallet, 2),
        ]));
        assert!(resolved.should_sign_with_signer);
        assert_eq!(resolved.wallet(), Some(wallet.as_str()));
    }

    #[test]
    fn test_first_wallet_wins() {
        let first = stellar_strkey::Contract([7u8; 32]).to_string();
        let second = stellar_strkey::Contract([8u8; 32]).to_string();
        let resolved = resolve_signer(&assembled(vec![
            transfer_entry(&first, 1),
            transfer_entry(&second, 2),
        ]));
        assert_eq!(resolved.wallet_contract_id, first);
    }
}

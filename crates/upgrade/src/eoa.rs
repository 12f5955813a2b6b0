//! Operations only the account's own key can perform.

use alloy::{
    eips::eip7702::{Authorization, SignedAuthorization},
    primitives::{Address, B256, Bytes, U256},
    signers::{SignerSync, local::PrivateKeySigner},
};
use tracing::debug;
use wallet_primitives::pack_ecdsa;

use crate::{
    error::{LedgerError, SignerError},
    ledger::Ledger,
};

/// Nonce the next authorization from `account` must carry.
///
/// Authorizations are processed after the sender's nonce is bumped, so when the account also
/// sends the transaction its authorization must use the following nonce.
pub async fn authorization_nonce<L: Ledger + ?Sized>(
    ledger: &L,
    account: Address,
) -> Result<u64, LedgerError> {
    let nonce = ledger.transaction_count(account).await?;
    Ok(if ledger.sender() == account { nonce + 1 } else { nonce })
}

/// Sign an authorization delegating `signer`'s account to `delegate`.
pub fn sign_authorization(
    signer: &PrivateKeySigner,
    chain_id: u64,
    delegate: Address,
    nonce: u64,
) -> Result<SignedAuthorization, SignerError> {
    let authorization = Authorization {
        chain_id: U256::from(chain_id),
        address: delegate,
        nonce,
    };
    let signature = signer.sign_hash_sync(&authorization.signature_hash())?;
    debug!(account = %signer.address(), %delegate, nonce, "Signed delegation authorization");
    Ok(authorization.into_signed(signature))
}

/// Sign a digest with the account key, without any message prefix.
pub fn sign_unprefixed(signer: &PrivateKeySigner, digest: B256) -> Result<Bytes, SignerError> {
    Ok(pack_ecdsa(&signer.sign_hash_sync(&digest)?))
}

//! Replay-protection nonces for `setImplementation`.

use alloy::primitives::{Address, U256};
use tracing::debug;
use wallet_contracts::INonceTracker;

use crate::{
    error::{LedgerError, WalletError},
    ledger::{Ledger, read_contract},
};

/// Reads the nonce tracker for an account.
///
/// The tracker only advances when a `setImplementation` transaction is mined, so the value read
/// here is the one the next commitment must carry. Read it immediately before building each
/// commitment; a value cached across steps is stale as soon as another attempt lands.
#[derive(Clone, Debug)]
pub struct NonceCoordinator<L> {
    ledger: L,
    tracker: Address,
}

impl<L: Ledger> NonceCoordinator<L> {
    pub const fn new(ledger: L, tracker: Address) -> Self {
        Self { ledger, tracker }
    }

    pub async fn current_nonce(&self, account: Address) -> Result<U256, LedgerError> {
        let nonce = read_contract(
            &self.ledger,
            self.tracker,
            &INonceTracker::noncesCall { account },
        )
        .await?;
        debug!(%account, %nonce, "Read tracker nonce");
        Ok(nonce)
    }

    /// Fails with [`WalletError::StaleNonce`] if the tracker moved past `expected`.
    pub async fn ensure_current(&self, account: Address, expected: U256) -> Result<(), WalletError> {
        let current = self.current_nonce(account).await?;
        if current != expected {
            return Err(WalletError::StaleNonce {
                account,
                expected,
                current,
            });
        }
        Ok(())
    }

    /// Check that exactly one nonce was consumed since `used` was read.
    ///
    /// Anything other than `used + 1` means a concurrent attempt consumed a nonce in between,
    /// and the confirmed transaction cannot be assumed to be ours.
    pub async fn confirm_consumed(&self, account: Address, used: U256) -> Result<U256, WalletError> {
        let expected = used.saturating_add(U256::from(1));
        let current = self.current_nonce(account).await?;
        if current != expected {
            return Err(WalletError::StaleNonce {
                account,
                expected,
                current,
            });
        }
        Ok(current)
    }
}

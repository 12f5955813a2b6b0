use alloy::primitives::{Address, B256, Bytes, U256};
use wallet_primitives::{IssueVector, OwnerCredential, WebAuthnError};

/// Failures reported by a [`Ledger`](crate::Ledger).
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("execution reverted ({} bytes of revert data)", data.len())]
    Reverted { data: Bytes },
    #[error("transaction {tx_hash} was not confirmed in time")]
    ReceiptTimeout { tx_hash: B256 },
    #[error("failed to decode call result: {0}")]
    Decode(#[from] alloy::sol_types::Error),
}

impl LedgerError {
    /// Whether retrying the same read may succeed.
    pub fn is_transient(&self) -> bool {
        let Self::Transport(msg) = self else {
            return false;
        };
        let msg = msg.to_lowercase();
        msg.contains("connection")
            || msg.contains("timeout")
            || msg.contains("timed out")
            || msg.contains("rate limit")
            || msg.contains("too many requests")
            || msg.contains("429")
            || msg.contains("502")
            || msg.contains("503")
            || msg.contains("504")
            || msg.contains("temporarily unavailable")
            || msg.contains("reset by peer")
            || msg.contains("broken pipe")
            || msg.contains("eof")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error(transparent)]
    Ecdsa(#[from] alloy::signers::Error),
    #[error("re-issuing a delegation needs the account's own key")]
    MissingAccountKey,
    #[error("owner signatures need the signing owner's index")]
    MissingOwnerIndex,
    #[error("invalid WebAuthn assertion: {0}")]
    WebAuthn(#[from] WebAuthnError),
    #[error("authenticator failed: {0}")]
    Authenticator(String),
    #[error("raw key controls {actual}, expected {expected}")]
    WrongAccountKey { expected: Address, actual: Address },
}

/// Errors that halt an upgrade or recovery sequence.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("stale nonce for {account}: expected {expected}, tracker reports {current}")]
    StaleNonce {
        account: Address,
        expected: U256,
        current: U256,
    },
    #[error("signature rejected during {step}: {reason}")]
    SignatureRejected { step: String, reason: String },
    #[error("{step} reverted: {reason}")]
    Reverted { step: String, reason: String },
    #[error("transaction {tx_hash} was not confirmed in time")]
    ConfirmationTimeout { tx_hash: B256 },
    #[error("transaction {tx_hash} failed on-chain")]
    TransactionFailed { tx_hash: B256 },

    #[error("account {account} has no code after delegation")]
    DelegationNotApplied { account: Address },
    #[error("{owner} is not registered as an owner of {account}")]
    OwnershipNotConfirmed {
        account: Address,
        owner: OwnerCredential,
    },
    #[error("{step} confirmed but {account} still reports {issues}")]
    RepairNotEffective {
        step: String,
        account: Address,
        issues: IssueVector,
    },

    #[error(
        "{account} cannot be recovered automatically ({issues}): the delegate and the owner set are both broken while the implementation is intact"
    )]
    Unrecoverable {
        account: Address,
        issues: IssueVector,
    },
    #[error(
        "{account} needs a new owner credential provisioned before it can be repaired ({issues})"
    )]
    OwnerProvisioningRequired {
        account: Address,
        issues: IssueVector,
    },

    #[error("sequence cancelled before {step}")]
    Cancelled { step: String },
}

impl WalletError {
    /// Map a submission failure into the error of the step that issued it.
    pub(crate) fn from_submission(step: &str, err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted { data } => match wallet_contracts::decode_proxy_revert(&data) {
                Some(revert) if revert.is_signature_rejection() => Self::SignatureRejected {
                    step: step.to_string(),
                    reason: "proxy rejected the signature".to_string(),
                },
                Some(revert) => Self::Reverted {
                    step: step.to_string(),
                    reason: format!("{revert:?}"),
                },
                None => Self::Reverted {
                    step: step.to_string(),
                    reason: format!("unknown revert data {data}"),
                },
            },
            LedgerError::ReceiptTimeout { tx_hash } => Self::ConfirmationTimeout { tx_hash },
            other => Self::Ledger(other),
        }
    }

    /// Terminal conditions that no repair step can resolve.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Unrecoverable { .. } | Self::OwnerProvisioningRequired { .. }
        )
    }
}

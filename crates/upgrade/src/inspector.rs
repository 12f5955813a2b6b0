//! Read-only classification of a delegated account.

use alloy::primitives::{Address, B256, Bytes, U256};
use tracing::{debug, info};
use wallet_contracts::IMPLEMENTATION_SLOT;
use wallet_primitives::{
    DelegateCode, DelegateMismatch, IssueVector, OwnerBytesError, OwnerCredential, OwnerSetLayout,
    StoredBytes,
};

use crate::{error::LedgerError, ledger::Ledger};

const MAX_OWNER_BYTES: usize = 64;

/// What a healthy account looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpectedState {
    /// Proxy template the account should delegate to.
    pub delegate: Address,
    /// Implementation the proxy should route to.
    pub implementation: Address,
    /// Owner registered when the account was upgraded.
    pub owner: OwnerCredential,
    /// Index the owner was registered at, if known.
    pub owner_index: Option<U256>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnershipFinding {
    Registered,
    /// `isOwner` is unset for the credential.
    Missing,
    /// The credential is an owner, but a different value sits at the expected index.
    IndexDrift { index: U256, found: Bytes },
    /// Storage at the expected index does not decode as `bytes`.
    Unreadable(OwnerBytesError),
}

impl OwnershipFinding {
    pub const fn is_disrupted(&self) -> bool {
        !matches!(self, Self::Registered)
    }
}

/// Everything read during one inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inspection {
    pub account: Address,
    pub code: DelegateCode,
    pub delegate_mismatch: Option<DelegateMismatch>,
    pub implementation: Address,
    pub ownership: OwnershipFinding,
    pub next_owner_index: U256,
    pub issues: IssueVector,
}

/// Classifies an account from its code and storage.
///
/// Ownership is read straight from the owner-set storage layout rather than through the wallet's
/// view functions, so it stays observable while the delegate is broken.
#[derive(Clone, Debug)]
pub struct StateInspector<L> {
    ledger: L,
    layout: OwnerSetLayout,
}

impl<L: Ledger> StateInspector<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            layout: OwnerSetLayout::default(),
        }
    }

    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn inspect(
        &self,
        account: Address,
        expected: &ExpectedState,
    ) -> Result<Inspection, LedgerError> {
        let code = DelegateCode::classify(&self.ledger.get_code(account).await?);
        let delegate_mismatch = code.check(expected.delegate).err();

        let slot = self.ledger.read_storage(account, IMPLEMENTATION_SLOT).await?;
        let implementation = Address::from_word(slot);

        let ownership = self.ownership(account, expected).await?;
        let next_owner_index = U256::from_be_bytes(
            self.ledger
                .read_storage(account, self.layout.next_owner_index_slot())
                .await?
                .0,
        );

        let issues = IssueVector::new(
            delegate_mismatch.is_some(),
            implementation != expected.implementation,
            ownership.is_disrupted(),
        );

        if let Some(mismatch) = &delegate_mismatch {
            debug!(%account, %mismatch, "Delegate mismatch");
        }
        info!(%account, %issues, %implementation, "Inspected account");

        Ok(Inspection {
            account,
            code,
            delegate_mismatch,
            implementation,
            ownership,
            next_owner_index,
            issues,
        })
    }

    async fn ownership(
        &self,
        account: Address,
        expected: &ExpectedState,
    ) -> Result<OwnershipFinding, LedgerError> {
        let owner = expected.owner.to_bytes();

        let flag = self
            .ledger
            .read_storage(account, self.layout.is_owner_slot(&owner))
            .await?;
        if flag == B256::ZERO {
            return Ok(OwnershipFinding::Missing);
        }

        let Some(index) = expected.owner_index else {
            return Ok(OwnershipFinding::Registered);
        };

        let found = match self.owner_at_index(account, index).await? {
            Ok(found) => found,
            Err(err) => return Ok(OwnershipFinding::Unreadable(err)),
        };
        if found != owner {
            return Ok(OwnershipFinding::IndexDrift { index, found });
        }
        Ok(OwnershipFinding::Registered)
    }

    /// Read `ownerAtIndex[index]`, following the long `bytes` encoding when needed.
    pub async fn owner_at_index(
        &self,
        account: Address,
        index: U256,
    ) -> Result<Result<Bytes, OwnerBytesError>, LedgerError> {
        let slot = self.layout.owner_at_index_slot(index);
        let head = self.ledger.read_storage(account, slot).await?;
        let stored = match StoredBytes::decode_head(slot, head) {
            Ok(stored) => stored,
            Err(err) => return Ok(Err(err)),
        };
        // Owner values are 32 or 64 bytes; refuse to walk arbitrary lengths.
        if let StoredBytes::Long { len, .. } = &stored
            && *len > MAX_OWNER_BYTES
        {
            return Ok(Err(OwnerBytesError::InvalidLength(*len)));
        }

        let mut words = Vec::new();
        for data_slot in stored.data_slots() {
            words.push(self.ledger.read_storage(account, data_slot).await?);
        }
        Ok(Ok(stored.assemble(&words)))
    }
}

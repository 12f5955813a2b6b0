//! Recovery of accounts left in a partial or inconsistent upgrade state.

use alloy::{
    primitives::{Address, B256, Bytes, U256},
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use wallet_contracts::IEIP7702Proxy;
use wallet_primitives::{
    IssueVector, OwnerCredential, SetImplementationCommitment, StepLog, VerificationStep,
};

use crate::{
    config::Deployment,
    eoa,
    error::{SignerError, WalletError},
    inspector::{ExpectedState, Inspection, StateInspector},
    ledger::{Ledger, WalletCall},
    nonce::NonceCoordinator,
    signer::{OwnerContext, SignatureProvider},
    steps::StepRecorder,
};

/// A single repair transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repair {
    /// Re-sign the EIP-7702 authorization naming the proxy template.
    Delegate,
    /// Point the ERC-1967 slot back at the expected implementation.
    Implementation,
}

/// What recovery does for a given [`IssueVector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryPlan {
    Healthy,
    RepairDelegate,
    RepairImplementation,
    /// Delegate first: the implementation repair is routed through a working delegate.
    RepairDelegateThenImplementation,
    /// The owner set is broken; a new credential has to be provisioned out of band.
    OwnerProvisioningRequired,
    /// Delegate and owners broken with the implementation intact.
    ///
    /// Fixing this needs an intermediate delegate that clears the implementation slot before
    /// reinstalling and reinitializing the wallet. That path does not exist yet.
    Unrecoverable,
}

impl RecoveryPlan {
    pub const fn for_issues(issues: IssueVector) -> Self {
        match (
            issues.delegate_incorrect,
            issues.implementation_incorrect,
            issues.ownership_disrupted,
        ) {
            (false, false, false) => Self::Healthy,
            (true, false, false) => Self::RepairDelegate,
            (false, true, false) => Self::RepairImplementation,
            (true, true, false) => Self::RepairDelegateThenImplementation,
            (true, false, true) => Self::Unrecoverable,
            (false, false, true) | (_, true, true) => Self::OwnerProvisioningRequired,
        }
    }

    /// Repairs to run, in order.
    pub const fn repairs(self) -> &'static [Repair] {
        match self {
            Self::RepairDelegate => &[Repair::Delegate],
            Self::RepairImplementation => &[Repair::Implementation],
            Self::RepairDelegateThenImplementation => &[Repair::Delegate, Repair::Implementation],
            Self::Healthy | Self::OwnerProvisioningRequired | Self::Unrecoverable => &[],
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::OwnerProvisioningRequired | Self::Unrecoverable)
    }

    fn terminal_error(self, account: Address, issues: IssueVector) -> Option<WalletError> {
        match self {
            Self::Unrecoverable => Some(WalletError::Unrecoverable { account, issues }),
            Self::OwnerProvisioningRequired => {
                Some(WalletError::OwnerProvisioningRequired { account, issues })
            }
            _ => None,
        }
    }
}

/// Keys available to a recovery attempt.
#[derive(Clone, Debug)]
pub struct RecoveryKeys {
    /// The account's own key, needed to re-sign its delegation.
    pub account: Option<PrivateKeySigner>,
    /// Signs set-implementation commitments.
    pub owner: SignatureProvider,
}

impl RecoveryKeys {
    /// The account key doing both jobs.
    pub fn from_account_key(key: PrivateKeySigner) -> Self {
        Self {
            account: Some(key.clone()),
            owner: SignatureProvider::RawKey(key),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecoveryOutcome {
    pub account: Address,
    /// Issues found before any repair.
    pub initial: IssueVector,
    pub plan: RecoveryPlan,
    /// Inspection taken after the last repair.
    pub inspection: Inspection,
    pub transactions: Vec<B256>,
    pub steps: StepLog,
}

/// Drives an account back to a healthy state, one confirmed repair at a time.
///
/// Every repair is followed by a fresh inspection; a mined transaction alone is not taken as
/// proof that the repair took effect. The first failure ends the attempt and is recorded on the
/// step that hit it.
#[derive(Debug)]
pub struct RecoveryOrchestrator<L> {
    ledger: L,
    inspector: StateInspector<L>,
    nonces: NonceCoordinator<L>,
    deployment: Deployment,
    chain_id: Option<u64>,
    cancel: CancellationToken,
}

impl<L: Ledger + Clone> RecoveryOrchestrator<L> {
    pub fn new(ledger: L, deployment: Deployment) -> Self {
        Self {
            inspector: StateInspector::new(ledger.clone()),
            nonces: NonceCoordinator::new(ledger.clone(), deployment.nonce_tracker),
            ledger,
            deployment,
            chain_id: None,
            cancel: CancellationToken::new(),
        }
    }

    pub const fn with_chain_id(mut self, chain_id: Option<u64>) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Abandon the sequence between steps once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn inspector(&self) -> &StateInspector<L> {
        &self.inspector
    }

    /// Healthy state for this deployment with `owner` registered.
    pub const fn expected_state(
        &self,
        owner: OwnerCredential,
        owner_index: Option<U256>,
    ) -> ExpectedState {
        ExpectedState {
            delegate: self.deployment.proxy_template,
            implementation: self.deployment.implementation,
            owner,
            owner_index,
        }
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        match self.chain_id {
            Some(chain_id) => Ok(chain_id),
            None => Ok(self.ledger.chain_id().await?),
        }
    }

    fn ensure_not_cancelled(&self, next: &str) -> Result<(), WalletError> {
        if self.cancel.is_cancelled() {
            warn!(step = next, "Recovery cancelled");
            return Err(WalletError::Cancelled {
                step: next.to_string(),
            });
        }
        Ok(())
    }

    /// Run one recovery attempt for `account`.
    pub async fn recover(
        &self,
        account: Address,
        keys: &RecoveryKeys,
        expected: &ExpectedState,
    ) -> Result<RecoveryOutcome, WalletError> {
        let steps = watch::Sender::new(StepLog::default());
        self.recover_with_observer(account, keys, expected, &steps).await
    }

    /// Like [`recover`](Self::recover), publishing every sealed step of this attempt on `steps`.
    ///
    /// The channel is cleared when the attempt starts. Concurrent attempts need their own
    /// channels.
    #[instrument(skip_all, fields(%account))]
    pub async fn recover_with_observer(
        &self,
        account: Address,
        keys: &RecoveryKeys,
        expected: &ExpectedState,
        steps: &watch::Sender<StepLog>,
    ) -> Result<RecoveryOutcome, WalletError> {
        let recorder = StepRecorder::start(steps);

        self.ensure_not_cancelled("inspection")?;
        let step = VerificationStep::new("Inspect account");
        let result = async {
            let chain_id = self.chain_id().await?;
            let inspection = self.inspector.inspect(account, expected).await?;
            Ok::<_, WalletError>((chain_id, inspection))
        }
        .await;
        let (chain_id, mut inspection) = recorder.finish(step, result)?;

        let initial = inspection.issues;
        let plan = RecoveryPlan::for_issues(initial);
        info!(issues = %initial, ?plan, "Selected recovery plan");

        if let Some(err) = plan.terminal_error(account, initial) {
            let step = VerificationStep::new("Classify account state");
            return recorder.finish(step, Err(err));
        }

        let repairs = plan.repairs();
        let mut transactions = Vec::with_capacity(repairs.len());

        for (i, repair) in repairs.iter().enumerate() {
            let description = match repair {
                Repair::Delegate => format!("Re-issue delegation to {}", expected.delegate),
                Repair::Implementation => {
                    format!("Set implementation to {}", expected.implementation)
                }
            };
            self.ensure_not_cancelled(&description)?;

            let mut step = VerificationStep::new(description.clone());
            let result = async {
                let tx_hash = match repair {
                    Repair::Delegate => {
                        let key = keys.account.as_ref();
                        self.repair_delegate(&mut step, account, key, expected, chain_id)
                            .await?
                    }
                    Repair::Implementation => {
                        self.repair_implementation(
                            &mut step,
                            account,
                            &keys.owner,
                            expected,
                            &inspection,
                            chain_id,
                        )
                        .await?
                    }
                };

                let after = self.inspector.inspect(account, expected).await?;
                let next = RecoveryPlan::for_issues(after.issues);
                if let Some(err) = next.terminal_error(account, after.issues) {
                    return Err(err);
                }
                if next.repairs() != &repairs[i + 1..] {
                    return Err(WalletError::RepairNotEffective {
                        step: description.clone(),
                        account,
                        issues: after.issues,
                    });
                }
                Ok::<_, WalletError>((tx_hash, after))
            }
            .await;
            let (tx_hash, after) = recorder.finish(step, result)?;

            transactions.push(tx_hash);
            inspection = after;
        }

        info!(transactions = transactions.len(), "Account healthy");

        Ok(RecoveryOutcome {
            account,
            initial,
            plan,
            inspection,
            transactions,
            steps: recorder.snapshot(),
        })
    }

    async fn repair_delegate(
        &self,
        step: &mut VerificationStep,
        account: Address,
        key: Option<&PrivateKeySigner>,
        expected: &ExpectedState,
        chain_id: u64,
    ) -> Result<B256, WalletError> {
        let key = key.ok_or(SignerError::MissingAccountKey)?;
        if key.address() != account {
            return Err(SignerError::WrongAccountKey {
                expected: account,
                actual: key.address(),
            }
            .into());
        }

        let nonce = eoa::authorization_nonce(&self.ledger, account).await?;
        let authorization = eoa::sign_authorization(key, chain_id, expected.delegate, nonce)?;
        let call = WalletCall::new(account, Bytes::new()).with_authorization(authorization);

        let tx_hash = self.submit(step, "delegate repair", call).await?;
        info!(%tx_hash, delegate = %expected.delegate, "Delegation re-issued");
        Ok(tx_hash)
    }

    async fn repair_implementation(
        &self,
        step: &mut VerificationStep,
        account: Address,
        owner: &SignatureProvider,
        expected: &ExpectedState,
        inspection: &Inspection,
        chain_id: u64,
    ) -> Result<B256, WalletError> {
        let nonce = self.nonces.current_nonce(account).await?;
        let commitment = SetImplementationCommitment {
            chain_id,
            proxy: expected.delegate,
            nonce,
            current_implementation: inspection.implementation,
            new_implementation: expected.implementation,
            call_data: Bytes::new(),
            validator: self.deployment.validator,
            allow_cross_chain_replay: false,
        };
        let hash = commitment.signature_hash();
        step.operation_hash = Some(hash);

        let context = OwnerContext {
            wallet: account,
            chain_id,
            owner_index: signing_index(owner, account, expected, inspection)?,
        };
        let signature = owner.sign(hash, &context).await?;

        // The tracker may have moved while we were signing.
        self.nonces.ensure_current(account, nonce).await?;

        let call = WalletCall::new(
            account,
            IEIP7702Proxy::setImplementationCall {
                newImplementation: commitment.new_implementation,
                callData: commitment.call_data.clone(),
                validator: commitment.validator,
                signature,
                allowCrossChainReplay: commitment.allow_cross_chain_replay,
            }
            .abi_encode(),
        );
        let tx_hash = self.submit(step, "setImplementation", call).await?;

        let current = self.nonces.confirm_consumed(account, nonce).await?;
        info!(%tx_hash, used = %nonce, %current, "Implementation repaired");
        Ok(tx_hash)
    }

    async fn submit(
        &self,
        step: &mut VerificationStep,
        name: &str,
        call: WalletCall,
    ) -> Result<B256, WalletError> {
        let tx_hash = self
            .ledger
            .send_transaction(call)
            .await
            .map_err(|err| WalletError::from_submission(name, err))?;
        step.transaction_hash = Some(tx_hash);

        let receipt = self
            .ledger
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|err| WalletError::from_submission(name, err))?;
        if !receipt.success {
            return Err(WalletError::TransactionFailed { tx_hash });
        }
        Ok(tx_hash)
    }
}

/// Owner index to sign with, or `None` when the account key signs for itself.
///
/// Without a known index this falls back to the most recently added owner.
fn signing_index(
    owner: &SignatureProvider,
    account: Address,
    expected: &ExpectedState,
    inspection: &Inspection,
) -> Result<Option<U256>, SignerError> {
    if owner.controls(account) {
        return Ok(None);
    }
    if owner.credential() == expected.owner
        && let Some(index) = expected.owner_index
    {
        return Ok(Some(index));
    }
    if inspection.next_owner_index.is_zero() {
        return Err(SignerError::MissingOwnerIndex);
    }
    Ok(Some(inspection.next_owner_index - U256::from(1)))
}

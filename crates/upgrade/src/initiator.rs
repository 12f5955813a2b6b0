//! First-time upgrade of an EOA into a smart wallet.

use alloy::{
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use tokio::sync::watch;
use tracing::{info, instrument};
use wallet_contracts::{IEIP7702Proxy, ISmartWallet, IWalletValidator};
use wallet_primitives::{
    DelegateCode, InitializationCommitment, OwnerCredential, StepLog, VerificationStep,
};

use crate::{
    config::Deployment,
    eoa,
    error::WalletError,
    ledger::{Ledger, WalletCall, read_contract},
    steps::StepRecorder,
};

/// Result of a completed upgrade.
#[derive(Clone, Debug)]
pub struct UpgradeOutcome {
    pub account: Address,
    pub tx_hash: B256,
    pub steps: StepLog,
}

/// Delegates an EOA to the proxy template and initializes its owners in one transaction.
///
/// Every failure ends the attempt. Nothing is retried: signatures are bound to the account's
/// authorization nonce, so a new attempt has to start over with fresh ones.
#[derive(Debug)]
pub struct UpgradeInitiator<L> {
    ledger: L,
    deployment: Deployment,
    chain_id: Option<u64>,
}

impl<L: Ledger> UpgradeInitiator<L> {
    pub fn new(ledger: L, deployment: Deployment) -> Self {
        Self {
            ledger,
            deployment,
            chain_id: None,
        }
    }

    /// Use `chain_id` instead of asking the ledger.
    pub const fn with_chain_id(mut self, chain_id: Option<u64>) -> Self {
        self.chain_id = chain_id;
        self
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        match self.chain_id {
            Some(chain_id) => Ok(chain_id),
            None => Ok(self.ledger.chain_id().await?),
        }
    }

    /// Upgrade the account controlled by `eoa`, registering `owners` as its wallet owners.
    pub async fn upgrade(
        &self,
        eoa: &PrivateKeySigner,
        owners: &[OwnerCredential],
    ) -> Result<UpgradeOutcome, WalletError> {
        let steps = watch::Sender::new(StepLog::default());
        self.upgrade_with_observer(eoa, owners, &steps).await
    }

    /// Like [`upgrade`](Self::upgrade), publishing every sealed step of this attempt on `steps`.
    #[instrument(skip_all, fields(account = %eoa.address()))]
    pub async fn upgrade_with_observer(
        &self,
        eoa: &PrivateKeySigner,
        owners: &[OwnerCredential],
        steps: &watch::Sender<StepLog>,
    ) -> Result<UpgradeOutcome, WalletError> {
        let recorder = StepRecorder::start(steps);
        let account = eoa.address();

        let step = VerificationStep::new("Sign delegation to proxy template");
        let result = async {
            let chain_id = self.chain_id().await?;
            let nonce = eoa::authorization_nonce(&self.ledger, account).await?;
            Ok::<_, WalletError>(eoa::sign_authorization(
                eoa,
                chain_id,
                self.deployment.proxy_template,
                nonce,
            )?)
        }
        .await;
        let authorization = recorder.finish(step, result)?;

        let commitment = InitializationCommitment::for_owners(self.deployment.proxy_template, owners);
        let init_hash = commitment.signature_hash();
        let step = VerificationStep::new("Sign initialization").with_operation_hash(init_hash);
        let result = eoa::sign_unprefixed(eoa, init_hash).map_err(WalletError::from);
        let signature = recorder.finish(step, result)?;

        let call = WalletCall::new(
            account,
            IEIP7702Proxy::initializeCall {
                args: commitment.init_args.clone(),
                signature,
            }
            .abi_encode(),
        )
        .with_authorization(authorization);

        let mut step = VerificationStep::new("Submit delegation and initialization");
        let result = self.submit(&mut step, "initialize", call).await;
        let tx_hash = recorder.finish(step, result)?;

        let step = VerificationStep::new("Verify delegation");
        let result = async {
            let code = DelegateCode::classify(&self.ledger.get_code(account).await?);
            if code == DelegateCode::Empty {
                return Err(WalletError::DelegationNotApplied { account });
            }
            Ok::<_, WalletError>(())
        }
        .await;
        recorder.finish(step, result)?;

        let step = VerificationStep::new("Verify ownership");
        let result = self.verify_owners(account, owners).await;
        recorder.finish(step, result)?;

        info!(%account, %tx_hash, owners = owners.len(), "Account upgraded");

        Ok(UpgradeOutcome {
            account,
            tx_hash,
            steps: recorder.snapshot(),
        })
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
        info!(%tx_hash, "Upgrade transaction submitted");

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

    async fn verify_owners(
        &self,
        account: Address,
        owners: &[OwnerCredential],
    ) -> Result<(), WalletError> {
        for owner in owners {
            let registered = match *owner {
                OwnerCredential::Address { address } => {
                    read_contract(&self.ledger, account, &ISmartWallet::isOwnerAddressCall {
                        account: address,
                    })
                    .await?
                }
                OwnerCredential::PublicKey { x, y } => {
                    read_contract(&self.ledger, account, &ISmartWallet::isOwnerPublicKeyCall {
                        x,
                        y,
                    })
                    .await?
                }
            };
            if !registered {
                return Err(WalletError::OwnershipNotConfirmed {
                    account,
                    owner: *owner,
                });
            }
        }

        read_contract(
            &self.ledger,
            self.deployment.validator,
            &IWalletValidator::validateWalletStateCall { wallet: account },
        )
        .await
        .map_err(|err| WalletError::from_submission("validateWalletState", err))?;
        Ok(())
    }
}

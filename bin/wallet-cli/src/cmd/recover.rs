use alloy::{
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
};
use clap::Parser;
use eyre::{Result, WrapErr, eyre};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use wallet_primitives::OwnerCredential;
use wallet_upgrade::{AlloyLedger, RecoveryKeys, RecoveryOrchestrator, SignatureProvider};

use super::follow_steps;
use crate::opts::{ConnectionArgs, PasskeyArgs, parse_owner};

#[derive(Parser, Debug)]
pub struct RecoverArgs {
    /// Account to recover
    account: Address,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Private key of the account, needed to re-issue its delegation
    #[arg(long, env = "WALLET_ACCOUNT_KEY", hide_env_values = true)]
    account_key: Option<PrivateKeySigner>,

    /// Private key paying for repair transactions (defaults to the account key)
    #[arg(long, env = "WALLET_RELAYER_KEY", hide_env_values = true)]
    relayer_key: Option<PrivateKeySigner>,

    /// Sign implementation repairs with a passkey owner instead of the account key
    #[command(flatten)]
    passkey: PasskeyArgs,

    /// Expected owner, as an address or 64-byte public key (defaults to the account)
    #[arg(long, value_parser = parse_owner)]
    owner: Option<OwnerCredential>,

    /// Index the expected owner was registered at
    #[arg(long)]
    owner_index: Option<U256>,
}

impl RecoverArgs {
    fn keys(&self) -> Result<RecoveryKeys> {
        let owner = match (self.passkey.signer()?, &self.account_key) {
            (Some(passkey), _) => SignatureProvider::from(passkey),
            (None, Some(key)) => SignatureProvider::from(key.clone()),
            (None, None) => return Err(eyre!("either --account-key or --passkey-key is required")),
        };
        Ok(RecoveryKeys {
            account: self.account_key.clone(),
            owner,
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.connection.resolve()?;
        let keys = self.keys()?;
        let relayer = self
            .relayer_key
            .clone()
            .or_else(|| self.account_key.clone())
            .ok_or_else(|| eyre!("--relayer-key is required without --account-key"))?;
        let ledger = AlloyLedger::connect(&config, relayer)
            .await
            .wrap_err("failed to connect to RPC")?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping before the next step");
                    cancel.cancel();
                }
            }
        });

        let orchestrator = RecoveryOrchestrator::new(ledger, config.contracts)
            .with_chain_id(config.chain_id)
            .with_cancellation(cancel);
        let expected = orchestrator.expected_state(
            self.owner
                .unwrap_or_else(|| OwnerCredential::address(self.account)),
            self.owner_index,
        );

        println!("Recovering {}", self.account);
        println!();

        let (steps, printer) = follow_steps();
        let result = orchestrator
            .recover_with_observer(self.account, &keys, &expected, &steps)
            .await;
        drop(steps);
        printer.await?;

        let outcome = result.wrap_err_with(|| format!("recovery of {} failed", self.account))?;
        println!();
        println!("Found:  {}", outcome.initial);
        println!("Plan:   {:?}", outcome.plan);
        println!("Result: {}", outcome.inspection.issues);
        for tx_hash in &outcome.transactions {
            println!("  repair transaction {tx_hash}");
        }

        Ok(())
    }
}

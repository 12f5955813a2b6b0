use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use eyre::{Result, WrapErr};
use wallet_primitives::OwnerCredential;
use wallet_upgrade::{AlloyLedger, UpgradeInitiator};

use super::follow_steps;
use crate::opts::{ConnectionArgs, PasskeyArgs, parse_owner};

#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Private key of the EOA being upgraded
    #[arg(long, env = "WALLET_ACCOUNT_KEY", hide_env_values = true)]
    account_key: PrivateKeySigner,

    /// Private key paying for the transaction (defaults to the account key)
    #[arg(long, env = "WALLET_RELAYER_KEY", hide_env_values = true)]
    relayer_key: Option<PrivateKeySigner>,

    /// Owner to register, as an address or 64-byte public key; repeatable
    #[arg(long = "owner", value_parser = parse_owner)]
    owners: Vec<OwnerCredential>,

    /// Also register this passkey as an owner
    #[command(flatten)]
    passkey: PasskeyArgs,
}

impl UpgradeArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.connection.resolve()?;
        let account = self.account_key.address();

        let mut owners = self.owners;
        if let Some(passkey) = self.passkey.signer()? {
            owners.push(passkey.credential());
        }
        if owners.is_empty() {
            owners.push(OwnerCredential::address(account));
        }

        let relayer = self.relayer_key.unwrap_or_else(|| self.account_key.clone());
        let ledger = AlloyLedger::connect(&config, relayer)
            .await
            .wrap_err("failed to connect to RPC")?;

        println!("Upgrading {account}");
        for owner in &owners {
            println!("  owner: {owner}");
        }
        println!();

        let initiator = UpgradeInitiator::new(ledger, config.contracts).with_chain_id(config.chain_id);
        let (steps, printer) = follow_steps();
        let result = initiator
            .upgrade_with_observer(&self.account_key, &owners, &steps)
            .await;
        drop(steps);
        printer.await?;

        let outcome = result.wrap_err_with(|| format!("upgrade of {account} failed"))?;
        println!();
        println!("Upgraded {} in {}", outcome.account, outcome.tx_hash);

        Ok(())
    }
}

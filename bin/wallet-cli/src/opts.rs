use std::path::PathBuf;

use alloy::primitives::{Address, B256, hex};
use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr, eyre};
use wallet_primitives::OwnerCredential;
use wallet_upgrade::{Deployment, PasskeySigner, SoftwarePasskey, WalletConfig};

use crate::cmd::{hash::HashArgs, inspect::InspectArgs, recover::RecoverArgs, upgrade::UpgradeArgs};

#[derive(Parser, Debug)]
#[command(name = "wallet")]
#[command(version, about = "CLI for EIP-7702 smart wallet upgrades", long_about = None)]
pub struct WalletCli {
    #[command(subcommand)]
    pub cmd: WalletSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum WalletSubcommand {
    /// Classify an account's delegation, implementation and ownership
    Inspect(InspectArgs),

    /// Delegate an EOA to the proxy template and initialize its owners
    Upgrade(UpgradeArgs),

    /// Repair an account left in a partial upgrade state
    Recover(RecoverArgs),

    /// Compute the digests signed during upgrade and recovery
    Hash(HashArgs),
}

/// RPC and deployment settings, from a config file and/or flags.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Path to wallet config file
    #[arg(short, long, env = "WALLET_CONFIG")]
    config: Option<PathBuf>,

    /// RPC URL (overrides config)
    #[arg(long, env = "WALLET_RPC_URL")]
    rpc_url: Option<String>,

    /// Chain id to sign for (overrides config and the RPC)
    #[arg(long)]
    chain_id: Option<u64>,

    /// Proxy template address (overrides config)
    #[arg(long)]
    proxy_template: Option<Address>,

    /// Wallet implementation address (overrides config)
    #[arg(long)]
    implementation: Option<Address>,

    /// State validator address (overrides config)
    #[arg(long)]
    validator: Option<Address>,

    /// Nonce tracker address (overrides config)
    #[arg(long)]
    nonce_tracker: Option<Address>,
}

impl ConnectionArgs {
    pub fn resolve(&self) -> Result<WalletConfig> {
        let mut config = match &self.config {
            Some(path) => WalletConfig::load(path).wrap_err("failed to load wallet config")?,
            None => {
                let required = |value: Option<Address>, flag: &str| {
                    value.ok_or_else(|| eyre!("{flag} is required without --config"))
                };
                WalletConfig::new(
                    self.rpc_url
                        .clone()
                        .ok_or_else(|| eyre!("--rpc-url is required without --config"))?,
                    Deployment {
                        proxy_template: required(self.proxy_template, "--proxy-template")?,
                        implementation: required(self.implementation, "--implementation")?,
                        validator: required(self.validator, "--validator")?,
                        nonce_tracker: required(self.nonce_tracker, "--nonce-tracker")?,
                    },
                )
            }
        };

        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url.clone_from(rpc_url);
        }
        if self.chain_id.is_some() {
            config.chain_id = self.chain_id;
        }
        let contracts = &mut config.contracts;
        contracts.proxy_template = self.proxy_template.unwrap_or(contracts.proxy_template);
        contracts.implementation = self.implementation.unwrap_or(contracts.implementation);
        contracts.validator = self.validator.unwrap_or(contracts.validator);
        contracts.nonce_tracker = self.nonce_tracker.unwrap_or(contracts.nonce_tracker);

        Ok(config)
    }
}

/// A software passkey used as a wallet owner.
#[derive(Args, Debug)]
pub struct PasskeyArgs {
    /// P-256 secret of a passkey owner
    #[arg(long, env = "WALLET_PASSKEY_KEY", hide_env_values = true)]
    passkey_key: Option<B256>,

    /// Relying party the passkey is scoped to
    #[arg(long, default_value = "localhost")]
    rp_id: String,
}

impl PasskeyArgs {
    pub fn signer(&self) -> Result<Option<PasskeySigner>> {
        let Some(secret) = &self.passkey_key else {
            return Ok(None);
        };
        let passkey = SoftwarePasskey::from_slice(secret.as_slice(), &self.rp_id)
            .wrap_err("invalid passkey secret")?;
        Ok(Some(PasskeySigner::new(passkey)))
    }
}

/// Parse an owner given as a 20-byte address or a 64-byte `x || y` P-256 key.
pub fn parse_owner(value: &str) -> Result<OwnerCredential, String> {
    let bytes = hex::decode(value).map_err(|err| err.to_string())?;
    match bytes.len() {
        20 => Ok(OwnerCredential::address(Address::from_slice(&bytes))),
        64 => OwnerCredential::from_bytes(&bytes).map_err(|err| err.to_string()),
        len => Err(format!("expected a 20-byte address or 64-byte public key, got {len} bytes")),
    }
}

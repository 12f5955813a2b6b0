//! Upgrade, inspection and recovery of EIP-7702 delegated smart wallets.
//!
//! An EOA is upgraded by delegating it to a proxy template and initializing the wallet behind it
//! in a single transaction ([`UpgradeInitiator`]). Afterwards [`StateInspector`] classifies the
//! account from its code and storage, and [`RecoveryOrchestrator`] repairs whatever it can.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod config;
pub mod eoa;
pub mod error;
pub mod initiator;
pub mod inspector;
pub mod ledger;
pub mod nonce;
pub mod orchestrator;
pub mod provider;
mod retry;
pub mod signer;
mod steps;

pub use config::{ConfigError, Deployment, WalletConfig};
pub use error::{LedgerError, SignerError, WalletError};
pub use initiator::{UpgradeInitiator, UpgradeOutcome};
pub use inspector::{ExpectedState, Inspection, OwnershipFinding, StateInspector};
pub use ledger::{CallReceipt, Ledger, WalletCall, read_contract};
pub use nonce::NonceCoordinator;
pub use orchestrator::{RecoveryKeys, RecoveryOrchestrator, RecoveryOutcome, RecoveryPlan, Repair};
pub use provider::AlloyLedger;
pub use signer::{
    OwnerContext, PasskeyAuthenticator, PasskeySigner, SignatureProvider, SoftwarePasskey,
};

#[cfg(test)]
mod tests;

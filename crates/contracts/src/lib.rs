//! Contract bindings for EIP-7702 smart wallet upgrades.
//!
//! The interfaces here describe the on-chain side of the upgrade protocol: the proxy template an
//! EOA delegates to, the nonce tracker guarding `setImplementation`, the validator checked after
//! an implementation change, and the multi-owner wallet that runs behind the proxy.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub use alloy_sol_types::sol;

pub mod constants;
pub mod nonce_tracker;
pub mod proxy;
pub mod smart_wallet;

pub use constants::*;
pub use nonce_tracker::INonceTracker;
pub use proxy::{IEIP7702Proxy, IWalletValidator, ProxyError, decode_proxy_revert};
pub use smart_wallet::{ISmartWallet, SignatureWrapper, WebAuthnAuth};

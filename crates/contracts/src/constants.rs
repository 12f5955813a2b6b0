//! Fixed values the on-chain contracts commit to.
//!
//! Changing any of these invalidates every signature produced against the previous value, so a
//! change must ship as a new, explicitly versioned deployment.

use alloy_primitives::{B256, b256};

/// Prefix of the code installed on an account by an EIP-7702 delegation designation.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Length of a delegation designation: prefix followed by the 20-byte delegate address.
pub const DELEGATION_CODE_LEN: usize = DELEGATION_PREFIX.len() + 20;

/// ERC-1967 implementation slot: `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Type descriptor bound into every set-implementation commitment.
pub const IMPLEMENTATION_SET_TYPE: &str = "EIP7702ProxyImplementationSet(uint256 chainId,address proxy,uint256 nonce,address currentImplementation,address newImplementation,bytes callData,address validator)";

/// ERC-7201 storage root of the multi-owner wallet's owner set.
///
/// `keccak256(abi.encode(uint256(keccak256("coinbase.storage.MultiOwnable")) - 1)) & ~bytes32(uint256(0xff))`
pub const MULTI_OWNABLE_STORAGE_ROOT: B256 =
    b256!("0x97e2c6aad4ce5d562ebfaa00db6b9e0fb66ea5d8162ed5b243f51a2e03086f00");

/// EIP-712 domain name used by the wallet's replay-safe hashing.
pub const SMART_WALLET_DOMAIN_NAME: &str = "Coinbase Smart Wallet";

/// EIP-712 domain version used by the wallet's replay-safe hashing.
pub const SMART_WALLET_DOMAIN_VERSION: &str = "1";

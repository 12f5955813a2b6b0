//! Commitments signed to authorize changes to a delegated account.
//!
//! Both hashes below are recomputed on-chain by the proxy template from its own view of the
//! account, so any drift in field order, encoding or domain inputs makes every signature fail.

use std::borrow::Cow;

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::{Eip712Domain, SolStruct, SolValue};
use wallet_contracts::{
    IMPLEMENTATION_SET_TYPE, SMART_WALLET_DOMAIN_NAME, SMART_WALLET_DOMAIN_VERSION,
    smart_wallet::CoinbaseSmartWalletMessage,
};

use crate::owner::OwnerCredential;

/// Authorization to point a delegated account at a new implementation.
///
/// Field order is fixed: `{chainId, proxy, nonce, currentImplementation, newImplementation,
/// callData, validator}`. The `nonce` must be the nonce tracker's current value for the account
/// when the commitment is built; a stale nonce yields a signature the proxy rejects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetImplementationCommitment {
    /// Chain the commitment is valid on.
    pub chain_id: u64,

    /// Address of the proxy template (not the delegating account).
    pub proxy: Address,

    /// Nonce tracker value for the account.
    pub nonce: U256,

    /// Implementation currently stored in the account's ERC-1967 slot.
    pub current_implementation: Address,

    /// Implementation to install.
    pub new_implementation: Address,

    /// Call made on the new implementation after the switch, hashed into the commitment.
    pub call_data: Bytes,

    /// Validator checking the resulting wallet state.
    pub validator: Address,

    /// Encode the chain id as zero so the signature replays on every chain.
    #[serde(default)]
    pub allow_cross_chain_replay: bool,
}

impl SetImplementationCommitment {
    /// `keccak256` of the set-implementation type descriptor.
    pub fn type_hash() -> B256 {
        keccak256(IMPLEMENTATION_SET_TYPE)
    }

    /// Chain id as it enters the encoding.
    pub const fn encoded_chain_id(&self) -> u64 {
        if self.allow_cross_chain_replay { 0 } else { self.chain_id }
    }

    /// Computes the digest the account owner signs.
    ///
    /// `keccak256(abi.encode(typeHash, chainId, proxy, nonce, currentImplementation,
    /// newImplementation, keccak256(callData), validator))`
    pub fn signature_hash(&self) -> B256 {
        let encoded = (
            Self::type_hash(),
            U256::from(self.encoded_chain_id()),
            self.proxy,
            self.nonce,
            self.current_implementation,
            self.new_implementation,
            keccak256(&self.call_data),
            self.validator,
        )
            .abi_encode_params();
        keccak256(encoded)
    }
}

/// Authorization for the first initialization of a freshly delegated account.
///
/// Carries no nonce: the EIP-7702 authorization submitted in the same transaction is what
/// prevents replay.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InitializationCommitment {
    /// Address of the proxy template.
    pub proxy: Address,

    /// ABI-encoded initializer arguments.
    pub init_args: Bytes,
}

impl InitializationCommitment {
    /// Build a commitment initializing the wallet with the given owners.
    pub fn for_owners(proxy: Address, owners: &[OwnerCredential]) -> Self {
        Self {
            proxy,
            init_args: encode_init_args(owners),
        }
    }

    /// `keccak256(abi.encode(proxy, initArgs))`
    pub fn signature_hash(&self) -> B256 {
        keccak256((self.proxy, self.init_args.clone()).abi_encode_params())
    }
}

/// Initializer arguments: `abi.encode(bytes[] owners)`.
pub fn encode_init_args(owners: &[OwnerCredential]) -> Bytes {
    let owners: Vec<Bytes> = owners.iter().map(OwnerCredential::to_bytes).collect();
    (owners,).abi_encode_params().into()
}

/// Decode initializer arguments back into raw owner bytes.
pub fn decode_init_args(init_args: &[u8]) -> Result<Vec<Bytes>, alloy_sol_types::Error> {
    let (owners,) = <(Vec<Bytes>,)>::abi_decode_params(init_args)?;
    Ok(owners)
}

/// Hash a registered owner signs when the wallet validates through ERC-1271.
///
/// The wallet wraps every digest in an EIP-712 message bound to its own address and chain so a
/// signature for one account cannot be replayed against another account sharing an owner.
pub fn replay_safe_hash(wallet: Address, chain_id: u64, hash: B256) -> B256 {
    let domain = Eip712Domain::new(
        Some(Cow::Borrowed(SMART_WALLET_DOMAIN_NAME)),
        Some(Cow::Borrowed(SMART_WALLET_DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(wallet),
        None,
    );
    CoinbaseSmartWalletMessage { hash }.eip712_signing_hash(&domain)
}

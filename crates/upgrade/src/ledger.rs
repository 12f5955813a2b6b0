//! The chain as seen by the upgrade and recovery flows.

use alloy::{
    eips::eip7702::SignedAuthorization,
    primitives::{Address, B256, Bytes, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::error::LedgerError;

/// A transaction sent by the relayer on behalf of an account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    /// EIP-7702 authorizations applied before the call executes.
    pub authorization_list: Vec<SignedAuthorization>,
}

impl WalletCall {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_authorization(mut self, authorization: SignedAuthorization) -> Self {
        self.authorization_list.push(authorization);
        self
    }
}

/// Outcome of a mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallReceipt {
    pub tx_hash: B256,
    pub success: bool,
}

/// Read and write access to the chain holding the account.
///
/// Writes are sent from, and paid for by, the relayer account returned by [`Ledger::sender`].
#[async_trait]
#[auto_impl(&, Arc)]
pub trait Ledger: Send + Sync {
    /// Relayer account submitting transactions.
    fn sender(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, LedgerError>;

    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, LedgerError>;

    /// `eth_call` against `to`, returning raw return data.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError>;

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError>;

    /// Number of transactions sent by `address`, which is also its next authorization nonce.
    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError>;

    /// Submit without waiting for inclusion.
    async fn send_transaction(&self, call: WalletCall) -> Result<B256, LedgerError>;

    /// Block until `tx_hash` is mined or the ledger's own deadline passes.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<CallReceipt, LedgerError>;
}

/// Call a view function and decode its return value.
pub async fn read_contract<L, C>(ledger: &L, to: Address, call: &C) -> Result<C::Return, LedgerError>
where
    L: Ledger + ?Sized,
    C: SolCall + Sync,
{
    let output = ledger.call(to, call.abi_encode().into()).await?;
    Ok(C::abi_decode_returns(&output)?)
}

//! [`Ledger`] backed by an alloy provider.

use std::time::Duration;

use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    primitives::{Address, B256, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    config::WalletConfig,
    error::LedgerError,
    ledger::{CallReceipt, Ledger, WalletCall},
    retry::with_retry,
};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ledger over an alloy provider whose wallet is the relayer.
///
/// Reads retry transient transport failures; submissions are sent exactly once.
#[derive(Clone)]
pub struct AlloyLedger<P> {
    provider: P,
    sender: Address,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl AlloyLedger<DynProvider> {
    /// Connect to the configured RPC with `relayer` paying for every transaction.
    pub async fn connect(config: &WalletConfig, relayer: PrivateKeySigner) -> Result<Self, LedgerError> {
        let sender = relayer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(relayer))
            .connect(&config.rpc_url)
            .await
            .map_err(from_rpc)?;

        info!(rpc_url = %config.rpc_url, relayer = %sender, "Connected to RPC");

        Ok(Self::new(provider.erased(), sender, config.receipt_timeout()))
    }

    /// Connect without a wallet. Submissions through this ledger are rejected by the node.
    pub async fn connect_read_only(config: &WalletConfig) -> Result<Self, LedgerError> {
        let provider = ProviderBuilder::new()
            .connect(&config.rpc_url)
            .await
            .map_err(from_rpc)?;
        Ok(Self::new(provider.erased(), Address::ZERO, config.receipt_timeout()))
    }
}

impl<P: Provider> AlloyLedger<P> {
    pub const fn new(provider: P, sender: Address, receipt_timeout: Duration) -> Self {
        Self {
            provider,
            sender,
            receipt_timeout,
            poll_interval: RECEIPT_POLL_INTERVAL,
        }
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

fn from_rpc(err: RpcError<TransportErrorKind>) -> LedgerError {
    if let Some(data) = err.as_error_resp().and_then(|payload| payload.as_revert_data()) {
        return LedgerError::Reverted { data };
    }
    LedgerError::Transport(err.to_string())
}

#[async_trait]
impl<P: Provider> Ledger for AlloyLedger<P> {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        with_retry("get_chain_id", || async {
            self.provider.get_chain_id().await.map_err(from_rpc)
        })
        .await
    }

    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, LedgerError> {
        let value = with_retry("get_storage_at", || async {
            self.provider
                .get_storage_at(address, U256::from_be_bytes(slot.0))
                .await
                .map_err(from_rpc)
        })
        .await?;
        Ok(B256::from(value))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        let tx = TransactionRequest::default().to(to).input(data.into());
        with_retry("eth_call", || async {
            self.provider.call(tx.clone()).await.map_err(from_rpc)
        })
        .await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        with_retry("get_code_at", || async {
            self.provider.get_code_at(address).await.map_err(from_rpc)
        })
        .await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        with_retry("get_transaction_count", || async {
            self.provider
                .get_transaction_count(address)
                .await
                .map_err(from_rpc)
        })
        .await
    }

    async fn send_transaction(&self, call: WalletCall) -> Result<B256, LedgerError> {
        let mut tx = TransactionRequest::default()
            .from(self.sender)
            .to(call.to)
            .value(call.value)
            .input(call.data.into());
        if !call.authorization_list.is_empty() {
            tx.authorization_list = Some(call.authorization_list);
        }

        let pending = self.provider.send_transaction(tx).await.map_err(from_rpc)?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, to = %call.to, "Transaction submitted");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<CallReceipt, LedgerError> {
        let poll = async {
            loop {
                let receipt = with_retry("get_transaction_receipt", || async {
                    self.provider
                        .get_transaction_receipt(tx_hash)
                        .await
                        .map_err(from_rpc)
                })
                .await?;
                if let Some(receipt) = receipt {
                    return Ok::<_, LedgerError>(receipt);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| LedgerError::ReceiptTimeout { tx_hash })??;

        Ok(CallReceipt {
            tx_hash,
            success: ReceiptResponse::status(&receipt),
        })
    }
}

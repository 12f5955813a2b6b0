//! In-memory chain emulating the proxy template, nonce tracker, validator and wallet storage.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use alloy::{
    primitives::{Address, B256, Bytes, U256, address, keccak256},
    signers::local::PrivateKeySigner,
    sol_types::{SolCall, SolError, SolInterface, SolValue},
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wallet_contracts::{
    IEIP7702Proxy::IEIP7702ProxyCalls,
    IMPLEMENTATION_SLOT, INonceTracker,
    ISmartWallet::ISmartWalletCalls,
    IWalletValidator, ProxyError, WebAuthnAuth,
};
use wallet_primitives::{
    DelegateCode, DelegationDesignation, InitializationCommitment, OwnerCredential,
    OwnerSetLayout, SetImplementationCommitment, StoredBytes,
    commitment::decode_init_args,
    replay_safe_hash,
    signature::{recover_packed, unwrap_owner_signature},
    webauthn,
};

use crate::{
    config::Deployment,
    error::LedgerError,
    ledger::{CallReceipt, Ledger, WalletCall},
};

pub(super) const CHAIN_ID: u64 = 31337;

pub(super) const PROXY_TEMPLATE: Address = address!("7702000000000000000000000000000000000001");
pub(super) const WALLET_IMPLEMENTATION: Address =
    address!("0000000000000000000000000000000000c0ffee");
/// An older wallet build that still validates owner signatures.
pub(super) const LEGACY_IMPLEMENTATION: Address =
    address!("00000000000000000000000000000000000c0de1");
pub(super) const VALIDATOR: Address = address!("7a11da7000000000000000000000000000000000");
pub(super) const NONCE_TRACKER: Address = address!("0ace000000000000000000000000000000000000");
pub(super) const FOREIGN_DELEGATE: Address = address!("baddbaddbaddbaddbaddbaddbaddbaddbaddbadd");
pub(super) const FOREIGN_IMPLEMENTATION: Address =
    address!("deaddeaddeaddeaddeaddeaddeaddeaddeaddead");

pub(super) fn deployment() -> Deployment {
    Deployment {
        proxy_template: PROXY_TEMPLATE,
        implementation: WALLET_IMPLEMENTATION,
        validator: VALIDATOR,
        nonce_tracker: NONCE_TRACKER,
    }
}

pub(super) fn relayer_key() -> PrivateKeySigner {
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        .parse()
        .unwrap()
}

pub(super) fn eoa_key() -> PrivateKeySigner {
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
        .parse()
        .unwrap()
}

pub(super) fn other_key() -> PrivateKeySigner {
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a"
        .parse()
        .unwrap()
}

fn word(value: U256) -> B256 {
    B256::from(value)
}

fn uint(word: B256) -> U256 {
    U256::from_be_bytes(word.0)
}

#[derive(Clone, Debug, Default)]
pub(super) struct AccountState {
    pub(super) code: Bytes,
    pub(super) storage: HashMap<B256, B256>,
    pub(super) nonce: u64,
}

impl AccountState {
    pub(super) fn sload(&self, slot: B256) -> B256 {
        self.storage.get(&slot).copied().unwrap_or_default()
    }

    pub(super) fn sstore(&mut self, slot: B256, value: B256) {
        if value.is_zero() {
            self.storage.remove(&slot);
        } else {
            self.storage.insert(slot, value);
        }
    }

    fn implementation(&self) -> Address {
        Address::from_word(self.sload(IMPLEMENTATION_SLOT))
    }

    fn next_owner_index(&self) -> U256 {
        uint(self.sload(OwnerSetLayout::default().next_owner_index_slot()))
    }

    /// Write a Solidity `bytes` value at `slot`.
    fn store_bytes(&mut self, slot: B256, value: &[u8]) {
        if value.len() < 32 {
            let mut head = [0u8; 32];
            head[..value.len()].copy_from_slice(value);
            head[31] = (value.len() * 2) as u8;
            self.sstore(slot, B256::from(head));
            return;
        }

        self.sstore(slot, word(U256::from(value.len() * 2 + 1)));
        let start = uint(keccak256(slot));
        for (i, chunk) in value.chunks(32).enumerate() {
            let mut data = [0u8; 32];
            data[..chunk.len()].copy_from_slice(chunk);
            self.sstore(word(start + U256::from(i)), B256::from(data));
        }
    }

    fn load_bytes(&self, slot: B256) -> Option<Bytes> {
        let stored = StoredBytes::decode_head(slot, self.sload(slot)).ok()?;
        let words: Vec<B256> = stored.data_slots().into_iter().map(|s| self.sload(s)).collect();
        Some(stored.assemble(&words))
    }

    pub(super) fn add_owner(&mut self, owner: &OwnerCredential) -> U256 {
        let layout = OwnerSetLayout::default();
        let index = self.next_owner_index();
        let bytes = owner.to_bytes();
        self.store_bytes(layout.owner_at_index_slot(index), &bytes);
        self.sstore(layout.is_owner_slot(&bytes), word(U256::from(1)));
        self.sstore(layout.next_owner_index_slot(), word(index + U256::from(1)));
        index
    }

    pub(super) fn remove_owner(&mut self, index: U256) {
        let layout = OwnerSetLayout::default();
        let slot = layout.owner_at_index_slot(index);
        if let Some(bytes) = self.load_bytes(slot) {
            self.sstore(layout.is_owner_slot(&bytes), B256::ZERO);
        }
        self.sstore(slot, B256::ZERO);
    }

    fn is_owner(&self, owner: &[u8]) -> bool {
        !self
            .sload(OwnerSetLayout::default().is_owner_slot(owner))
            .is_zero()
    }

    fn owner_at(&self, index: U256) -> Option<OwnerCredential> {
        let bytes = self.load_bytes(OwnerSetLayout::default().owner_at_index_slot(index))?;
        OwnerCredential::from_bytes(&bytes).ok()
    }
}

#[derive(Clone, Debug)]
pub(super) struct ChainState {
    pub(super) chain_id: u64,
    pub(super) accounts: HashMap<Address, AccountState>,
    pub(super) tracker: HashMap<Address, U256>,
    receipts: HashMap<B256, CallReceipt>,
    pub(super) mined: Vec<WalletCall>,
}

impl ChainState {
    pub(super) fn account(&mut self, address: Address) -> &mut AccountState {
        self.accounts.entry(address).or_default()
    }

    fn bump_tracker(&mut self, account: Address) {
        *self.tracker.entry(account).or_default() += U256::from(1);
    }
}

/// Ledger over [`ChainState`], with switches to inject races and failures.
#[derive(Debug)]
pub(super) struct MockChain {
    sender: Address,
    deployment: Deployment,
    wallet_implementations: HashSet<Address>,
    state: Mutex<ChainState>,

    /// The next tracker read is followed by a concurrent `setImplementation` landing.
    race_after_nonce_read: AtomicBool,
    /// A concurrent `setImplementation` lands right before the next submission.
    race_before_send: AtomicBool,
    /// A concurrent `setImplementation` lands right after the next transaction is mined.
    race_after_mine: AtomicBool,
    /// Mine the next transaction as failed.
    fail_next_receipt: AtomicBool,
    /// Never confirm the next transaction.
    drop_next_receipt: AtomicBool,
    cancel_on_send: Mutex<Option<CancellationToken>>,
    /// Yield to the scheduler before serving each request, so concurrent callers interleave.
    interleave: AtomicBool,
    /// Chain id requests fail.
    chain_id_unavailable: AtomicBool,
}

impl MockChain {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            sender: relayer_key().address(),
            deployment: deployment(),
            wallet_implementations: [WALLET_IMPLEMENTATION, LEGACY_IMPLEMENTATION].into(),
            state: Mutex::new(ChainState {
                chain_id: CHAIN_ID,
                accounts: HashMap::new(),
                tracker: HashMap::new(),
                receipts: HashMap::new(),
                mined: Vec::new(),
            }),
            race_after_nonce_read: AtomicBool::new(false),
            race_before_send: AtomicBool::new(false),
            race_after_mine: AtomicBool::new(false),
            fail_next_receipt: AtomicBool::new(false),
            drop_next_receipt: AtomicBool::new(false),
            cancel_on_send: Mutex::new(None),
            interleave: AtomicBool::new(false),
            chain_id_unavailable: AtomicBool::new(false),
        })
    }

    /// Mutate chain state outside of any transaction.
    pub(super) fn with_state<T>(&self, f: impl FnOnce(&mut ChainState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub(super) fn set_delegate(&self, account: Address, delegate: Address) {
        self.with_state(|state| {
            state.account(account).code = DelegationDesignation::new(delegate).to_code();
        });
    }

    pub(super) fn set_code(&self, account: Address, code: Bytes) {
        self.with_state(|state| state.account(account).code = code);
    }

    pub(super) fn set_implementation(&self, account: Address, implementation: Address) {
        self.with_state(|state| {
            state
                .account(account)
                .sstore(IMPLEMENTATION_SLOT, implementation.into_word());
        });
    }

    pub(super) fn remove_owner(&self, account: Address, index: U256) {
        self.with_state(|state| state.account(account).remove_owner(index));
    }

    pub(super) fn add_owner(&self, account: Address, owner: &OwnerCredential) -> U256 {
        self.with_state(|state| state.account(account).add_owner(owner))
    }

    pub(super) fn tracker_nonce(&self, account: Address) -> U256 {
        self.with_state(|state| state.tracker.get(&account).copied().unwrap_or_default())
    }

    pub(super) fn mined(&self) -> Vec<WalletCall> {
        self.with_state(|state| state.mined.clone())
    }

    pub(super) fn race_after_nonce_read(&self) {
        self.race_after_nonce_read.store(true, Ordering::SeqCst);
    }

    pub(super) fn race_before_send(&self) {
        self.race_before_send.store(true, Ordering::SeqCst);
    }

    pub(super) fn race_after_mine(&self) {
        self.race_after_mine.store(true, Ordering::SeqCst);
    }

    pub(super) fn fail_next_receipt(&self) {
        self.fail_next_receipt.store(true, Ordering::SeqCst);
    }

    pub(super) fn drop_next_receipt(&self) {
        self.drop_next_receipt.store(true, Ordering::SeqCst);
    }

    pub(super) fn cancel_on_send(&self, token: CancellationToken) {
        *self.cancel_on_send.lock().unwrap() = Some(token);
    }

    pub(super) fn interleave(&self) {
        self.interleave.store(true, Ordering::SeqCst);
    }

    pub(super) fn chain_id_unavailable(&self) {
        self.chain_id_unavailable.store(true, Ordering::SeqCst);
    }

    async fn pause(&self) {
        if self.interleave.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    fn delegates_to_proxy(&self, account: &AccountState) -> bool {
        DelegateCode::classify(&account.code)
            .check(self.deployment.proxy_template)
            .is_ok()
    }

    fn is_wallet(&self, account: &AccountState) -> bool {
        self.delegates_to_proxy(account)
            && self.wallet_implementations.contains(&account.implementation())
    }

    fn view(&self, state: &ChainState, to: Address, data: &[u8]) -> Result<Bytes, Bytes> {
        if to == self.deployment.nonce_tracker {
            let call = <INonceTracker::noncesCall as SolCall>::abi_decode(data)
                .map_err(|_| Bytes::new())?;
            let nonce = state.tracker.get(&call.account).copied().unwrap_or_default();
            return Ok(nonce.abi_encode().into());
        }

        if to == self.deployment.validator {
            let call = <IWalletValidator::validateWalletStateCall as SolCall>::abi_decode(data)
                .map_err(|_| Bytes::new())?;
            let healthy = state.accounts.get(&call.wallet).is_some_and(|account| {
                self.wallet_implementations.contains(&account.implementation())
                    && !account.next_owner_index().is_zero()
            });
            if !healthy {
                return Err(SolError::abi_encode(&IWalletValidator::Uninitialized {}).into());
            }
            return Ok(Bytes::new());
        }

        let Some(account) = state.accounts.get(&to).filter(|a| self.is_wallet(a)) else {
            return Ok(Bytes::new());
        };
        let call = ISmartWalletCalls::abi_decode(data).map_err(|_| Bytes::new())?;
        let output = match call {
            ISmartWalletCalls::isOwnerAddress(c) => account
                .is_owner(&OwnerCredential::address(c.account).to_bytes())
                .abi_encode(),
            ISmartWalletCalls::isOwnerPublicKey(c) => account
                .is_owner(&OwnerCredential::PublicKey { x: c.x, y: c.y }.to_bytes())
                .abi_encode(),
            _ => return Err(Bytes::new()),
        };
        Ok(output.into())
    }

    /// Apply authorizations the way EIP-7702 does: invalid entries are skipped.
    fn apply_authorizations(&self, state: &mut ChainState, call: &WalletCall) {
        for authorization in &call.authorization_list {
            let Ok(authority) = authorization.recover_authority() else {
                continue;
            };
            let inner = authorization.inner();
            if !inner.chain_id.is_zero() && inner.chain_id != U256::from(state.chain_id) {
                continue;
            }
            let account = state.account(authority);
            if account.nonce != inner.nonce {
                continue;
            }
            account.code = if inner.address.is_zero() {
                Bytes::new()
            } else {
                DelegationDesignation::new(inner.address).to_code()
            };
            account.nonce += 1;
        }
    }

    fn owner_signature_valid(
        &self,
        state: &ChainState,
        wallet: Address,
        hash: B256,
        signature: &[u8],
    ) -> bool {
        let Some(account) = state.accounts.get(&wallet) else {
            return false;
        };
        if !self.wallet_implementations.contains(&account.implementation()) {
            return false;
        }
        let Ok(wrapper) = unwrap_owner_signature(signature) else {
            return false;
        };
        let Some(owner) = account.owner_at(wrapper.ownerIndex) else {
            return false;
        };

        let hash = replay_safe_hash(wallet, state.chain_id, hash);
        match owner {
            OwnerCredential::Address { address } => {
                recover_packed(&hash, &wrapper.signatureData) == Some(address)
            }
            OwnerCredential::PublicKey { x, y } => {
                WebAuthnAuth::abi_decode(&wrapper.signatureData)
                    .is_ok_and(|auth| webauthn::verify(&auth, &hash, &x, &y, false))
            }
        }
    }

    fn execute(&self, state: &mut ChainState, call: &WalletCall) -> Result<(), Bytes> {
        self.apply_authorizations(state, call);

        let to = call.to;
        let delegated = state
            .accounts
            .get(&to)
            .is_some_and(|account| self.delegates_to_proxy(account));
        if call.data.is_empty() {
            return Ok(());
        }
        if !delegated {
            return Err(Bytes::new());
        }

        let revert = |err: ProxyError| -> Bytes { err.abi_encode().into() };
        match IEIP7702ProxyCalls::abi_decode(&call.data).map_err(|_| Bytes::new())? {
            IEIP7702ProxyCalls::initialize(init) => {
                let account = state.account(to);
                if !account.next_owner_index().is_zero() {
                    return Err(revert(ProxyError::already_initialized()));
                }
                let hash = InitializationCommitment {
                    proxy: self.deployment.proxy_template,
                    init_args: init.args.clone(),
                }
                .signature_hash();
                if recover_packed(&hash, &init.signature) != Some(to) {
                    return Err(revert(ProxyError::invalid_signature()));
                }

                let owners = decode_init_args(&init.args).map_err(|_| Bytes::new())?;
                let owners = owners
                    .iter()
                    .map(|bytes| OwnerCredential::from_bytes(bytes))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| Bytes::new())?;

                account.sstore(IMPLEMENTATION_SLOT, self.deployment.implementation.into_word());
                for owner in &owners {
                    account.add_owner(owner);
                }
                Ok(())
            }
            IEIP7702ProxyCalls::setImplementation(set) => {
                let nonce = state.tracker.get(&to).copied().unwrap_or_default();
                let current = state.account(to).implementation();
                let hash = SetImplementationCommitment {
                    chain_id: state.chain_id,
                    proxy: self.deployment.proxy_template,
                    nonce,
                    current_implementation: current,
                    new_implementation: set.newImplementation,
                    call_data: set.callData.clone(),
                    validator: set.validator,
                    allow_cross_chain_replay: set.allowCrossChainReplay,
                }
                .signature_hash();

                let signed_by_account = recover_packed(&hash, &set.signature) == Some(to);
                if !signed_by_account
                    && !self.owner_signature_valid(state, to, hash, &set.signature)
                {
                    return Err(revert(ProxyError::invalid_signature()));
                }
                state.bump_tracker(to);

                let account = state.account(to);
                account.sstore(IMPLEMENTATION_SLOT, set.newImplementation.into_word());
                if set.validator != self.deployment.validator
                    || !self.wallet_implementations.contains(&set.newImplementation)
                    || account.next_owner_index().is_zero()
                {
                    return Err(revert(ProxyError::invalid_validation()));
                }
                Ok(())
            }
            IEIP7702ProxyCalls::isValidSignature(_) => Ok(()),
        }
    }
}

#[async_trait]
impl Ledger for MockChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.pause().await;
        if self.chain_id_unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(self.with_state(|state| state.chain_id))
    }

    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, LedgerError> {
        self.pause().await;
        Ok(self.with_state(|state| {
            state
                .accounts
                .get(&address)
                .map(|account| account.sload(slot))
                .unwrap_or_default()
        }))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, LedgerError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        let output = self
            .view(&state, to, &data)
            .map_err(|data| LedgerError::Reverted { data })?;

        if to == self.deployment.nonce_tracker
            && self.race_after_nonce_read.swap(false, Ordering::SeqCst)
        {
            let call = <INonceTracker::noncesCall as SolCall>::abi_decode(&data)?;
            state.bump_tracker(call.account);
        }
        Ok(output)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.pause().await;
        Ok(self.with_state(|state| {
            state
                .accounts
                .get(&address)
                .map(|account| account.code.clone())
                .unwrap_or_default()
        }))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        self.pause().await;
        Ok(self.with_state(|state| state.accounts.get(&address).map_or(0, |a| a.nonce)))
    }

    async fn send_transaction(&self, call: WalletCall) -> Result<B256, LedgerError> {
        self.pause().await;
        if let Some(token) = self.cancel_on_send.lock().unwrap().take() {
            token.cancel();
        }

        let mut state = self.state.lock().unwrap();
        if self.race_before_send.swap(false, Ordering::SeqCst) {
            state.bump_tracker(call.to);
        }

        // Execute against a copy so a revert leaves no trace, like a failed gas estimate.
        let mut next = state.clone();
        next.account(self.sender).nonce += 1;
        self.execute(&mut next, &call)
            .map_err(|data| LedgerError::Reverted { data })?;

        let tx_hash = keccak256(U256::from(next.mined.len()).to_be_bytes::<32>());
        let success = !self.fail_next_receipt.swap(false, Ordering::SeqCst);
        if success {
            *state = next;
        } else {
            state.account(self.sender).nonce += 1;
        }
        state.mined.push(call.clone());
        if !self.drop_next_receipt.swap(false, Ordering::SeqCst) {
            state.receipts.insert(tx_hash, CallReceipt { tx_hash, success });
        }

        if self.race_after_mine.swap(false, Ordering::SeqCst) {
            state.bump_tracker(call.to);
        }
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<CallReceipt, LedgerError> {
        self.pause().await;
        self.with_state(|state| state.receipts.get(&tx_hash).copied())
            .ok_or(LedgerError::ReceiptTimeout { tx_hash })
    }
}

/// Upgrade [`eoa_key`] with itself as the only owner.
pub(super) async fn upgraded_chain() -> (Arc<MockChain>, PrivateKeySigner) {
    let chain = MockChain::new();
    let eoa = eoa_key();
    crate::UpgradeInitiator::new(chain.clone(), deployment())
        .upgrade(&eoa, &[OwnerCredential::address(eoa.address())])
        .await
        .unwrap();
    (chain, eoa)
}

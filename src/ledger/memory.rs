//! Ledger implementation in-memory. For testing only.
//!
//! Transactions take effect when [`Transactor::await_finality`] is called for them, which
//! mirrors a block being mined after submission.

use super::{Clipboard, Finality, GiftLedger, Result, Transactor, WalletSession};
use crate::{
    error::LedgerError,
    types::{Gift, GiftId, TokenMetadata},
};
use alloy::primitives::{Address, B256, U256, keccak256};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

/// A call made against an [`InMemoryLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// [`GiftLedger::gift`]
    Gift(GiftId),
    /// [`GiftLedger::allowance`]
    Allowance {
        /// Token.
        token: Address,
        /// Owner.
        owner: Address,
        /// Spender.
        spender: Address,
    },
    /// [`GiftLedger::token_metadata`]
    TokenMetadata(Address),
    /// [`Transactor::approve`]
    Approve {
        /// Token.
        token: Address,
        /// Spender.
        spender: Address,
        /// Approved amount.
        amount: U256,
    },
    /// [`Transactor::deposit`]
    Deposit {
        /// Escrow contract.
        contract: Address,
        /// Gift.
        id: GiftId,
        /// Attached value.
        value: U256,
    },
    /// [`Transactor::await_finality`]
    AwaitFinality(B256),
}

impl LedgerCall {
    /// Whether this call submits a transaction.
    pub fn is_submission(&self) -> bool {
        matches!(self, Self::Approve { .. } | Self::Deposit { .. })
    }
}

/// Scripted outcome of the next submission.
#[derive(Debug)]
enum Scripted {
    Reject,
    Fail(String),
    Revert(Option<String>),
}

#[derive(Debug, Clone)]
enum PendingAction {
    Approve { token: Address, owner: Address, spender: Address, amount: U256 },
    Deposit { contract: Address, id: GiftId, from: Address, value: U256 },
    Revert(Option<String>),
}

/// [`GiftLedger`], [`Transactor`] and [`WalletSession`] implementation in-memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    gifts: DashMap<(Address, GiftId), Gift>,
    allowances: DashMap<(Address, Address, Address), U256>,
    tokens: DashMap<Address, TokenMetadata>,
    paused_tokens: DashMap<Address, ()>,
    gift_read_delays: DashMap<GiftId, Duration>,
    failing_gift_reads: AtomicU32,
    failing_allowance_reads: AtomicU32,
    stale_approvals: AtomicBool,
    account: Mutex<Option<Address>>,
    scripted: Mutex<VecDeque<Scripted>>,
    pending: DashMap<B256, PendingAction>,
    finality_delay: Mutex<Duration>,
    nonce: AtomicU64,
    calls: Mutex<Vec<LedgerCall>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger with `account` connected.
    pub fn with_account(account: Address) -> Self {
        let ledger = Self::default();
        ledger.connect(account);
        ledger
    }

    /// Stores `gift` under `code` in `contract`.
    pub fn insert_gift(&self, contract: Address, code: &str, gift: Gift) {
        self.gifts.insert((contract, GiftId::from_code(code)), gift);
    }

    /// Returns the gift stored under `code` in `contract`.
    pub fn gift_by_code(&self, contract: Address, code: &str) -> Option<Gift> {
        self.gifts.get(&(contract, GiftId::from_code(code))).map(|gift| gift.clone())
    }

    /// Registers token metadata.
    pub fn insert_token(&self, token: Address, metadata: TokenMetadata) {
        self.tokens.insert(token, metadata);
    }

    /// Sets the allowance of `spender` over `owner`'s `token`.
    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((token, owner, spender), amount);
    }

    /// Makes every transaction touching `token` fail with a circuit-breaker error.
    pub fn pause_token(&self, token: Address) {
        self.paused_tokens.insert(token, ());
    }

    /// Connects `account`.
    pub fn connect(&self, account: Address) {
        *lock(&self.account) = Some(account);
    }

    /// Disconnects the account.
    pub fn disconnect(&self) {
        *lock(&self.account) = None;
    }

    /// Makes the next `count` gift reads fail.
    pub fn fail_gift_reads(&self, count: u32) {
        self.failing_gift_reads.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` allowance reads fail.
    pub fn fail_allowance_reads(&self, count: u32) {
        self.failing_allowance_reads.store(count, Ordering::SeqCst);
    }

    /// Makes approvals finalize without changing the allowance.
    pub fn ignore_approvals(&self) {
        self.stale_approvals.store(true, Ordering::SeqCst);
    }

    /// Delays reads of the gift under `code`.
    pub fn delay_gift_read(&self, code: &str, delay: Duration) {
        self.gift_read_delays.insert(GiftId::from_code(code), delay);
    }

    /// Delays [`Transactor::await_finality`].
    pub fn set_finality_delay(&self, delay: Duration) {
        *lock(&self.finality_delay) = delay;
    }

    /// Makes the next submission be declined by the signer.
    pub fn reject_next_submission(&self) {
        lock(&self.scripted).push_back(Scripted::Reject);
    }

    /// Makes the next submission fail with `message`.
    pub fn fail_next_submission(&self, message: impl Into<String>) {
        lock(&self.scripted).push_back(Scripted::Fail(message.into()));
    }

    /// Makes the next submitted transaction revert once included.
    pub fn revert_next_transaction(&self, reason: Option<&str>) {
        lock(&self.scripted).push_back(Scripted::Revert(reason.map(Into::into)));
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<LedgerCall> {
        lock(&self.calls).clone()
    }

    /// The submissions made so far.
    pub fn submissions(&self) -> Vec<LedgerCall> {
        self.calls().into_iter().filter(LedgerCall::is_submission).collect()
    }

    fn record(&self, call: LedgerCall) {
        lock(&self.calls).push(call);
    }

    fn next_tx_hash(&self) -> B256 {
        keccak256(self.nonce.fetch_add(1, Ordering::SeqCst).to_be_bytes())
    }

    fn account(&self) -> Result<Address> {
        lock(&self.account).ok_or(LedgerError::WalletNotConnected)
    }

    fn submit(&self, token: Option<Address>, action: PendingAction) -> Result<B256> {
        if let Some(token) = token.filter(|token| self.paused_tokens.contains_key(token)) {
            return Err(LedgerError::Other(eyre::eyre!(
                "execution reverted: CircuitBreaker: transfers of {token} are paused"
            )));
        }

        let action = match lock(&self.scripted).pop_front() {
            Some(Scripted::Reject) => {
                return Err(LedgerError::Rejected("User rejected the request.".into()));
            }
            Some(Scripted::Fail(message)) => return Err(LedgerError::Other(eyre::eyre!(message))),
            Some(Scripted::Revert(reason)) => PendingAction::Revert(reason),
            None => action,
        };

        let tx_hash = self.next_tx_hash();
        self.pending.insert(tx_hash, action);

        Ok(tx_hash)
    }

    fn apply(&self, action: PendingAction) -> Finality {
        match action {
            PendingAction::Approve { token, owner, spender, amount } => {
                if !self.stale_approvals.load(Ordering::SeqCst) {
                    self.allowances.insert((token, owner, spender), amount);
                }
                Finality::Finalized
            }
            PendingAction::Deposit { contract, id, from, value } => {
                let Some(mut gift) = self.gifts.get_mut(&(contract, id)) else {
                    return reverted("Gift does not exist");
                };

                if gift.deposited {
                    return reverted("Gift already deposited");
                }

                if gift.token.is_zero() {
                    if value != gift.amount {
                        return reverted("Incorrect amount");
                    }
                } else {
                    let key = (gift.token, from, contract);
                    let allowance = self.allowances.get(&key).map(|a| *a).unwrap_or_default();
                    if allowance < gift.amount {
                        return reverted("ERC20: insufficient allowance");
                    }
                    self.allowances.insert(key, allowance - gift.amount);
                }

                gift.deposited = true;
                gift.gifter = from;
                Finality::Finalized
            }
            PendingAction::Revert(reason) => Finality::Reverted { reason },
        }
    }
}

fn reverted(reason: &str) -> Finality {
    Finality::Reverted { reason: Some(reason.to_string()) }
}

/// Fails if `remaining` scripted failures are left, consuming one.
fn fail_read(remaining: &AtomicU32) -> Result<()> {
    match remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)) {
        Ok(_) => Err(LedgerError::Other(eyre::eyre!("connection reset by peer"))),
        Err(_) => Ok(()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl GiftLedger for InMemoryLedger {
    async fn gift(&self, contract: Address, id: GiftId) -> Result<Gift> {
        self.record(LedgerCall::Gift(id));

        let delay = self.gift_read_delays.get(&id).map(|delay| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        fail_read(&self.failing_gift_reads)?;

        Ok(self.gifts.get(&(contract, id)).map(|gift| gift.clone()).unwrap_or_default())
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        self.record(LedgerCall::Allowance { token, owner, spender });
        fail_read(&self.failing_allowance_reads)?;
        Ok(self.allowances.get(&(token, owner, spender)).map(|a| *a).unwrap_or_default())
    }

    async fn token_metadata(&self, token: Address) -> TokenMetadata {
        self.record(LedgerCall::TokenMetadata(token));
        self.tokens.get(&token).map(|metadata| metadata.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transactor for InMemoryLedger {
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<B256> {
        self.record(LedgerCall::Approve { token, spender, amount });
        let owner = self.account()?;
        self.submit(Some(token), PendingAction::Approve { token, owner, spender, amount })
    }

    async fn deposit(&self, contract: Address, id: GiftId, value: U256) -> Result<B256> {
        self.record(LedgerCall::Deposit { contract, id, value });
        let from = self.account()?;
        let token = self
            .gifts
            .get(&(contract, id))
            .map(|gift| gift.token)
            .filter(|token| !token.is_zero());
        self.submit(token, PendingAction::Deposit { contract, id, from, value })
    }

    async fn await_finality(&self, tx_hash: B256) -> Result<Finality> {
        self.record(LedgerCall::AwaitFinality(tx_hash));

        let delay = *lock(&self.finality_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (_, action) = self.pending.remove(&tx_hash).ok_or(LedgerError::Dropped(tx_hash))?;
        Ok(self.apply(action))
    }
}

impl WalletSession for InMemoryLedger {
    fn connected_address(&self) -> Option<Address> {
        *lock(&self.account)
    }
}

/// [`Clipboard`] that keeps everything written to it.
#[derive(Debug, Default)]
pub struct InMemoryClipboard {
    contents: Mutex<Vec<String>>,
}

impl InMemoryClipboard {
    /// Everything copied so far, oldest first.
    pub fn contents(&self) -> Vec<String> {
        lock(&self.contents).clone()
    }
}

impl Clipboard for InMemoryClipboard {
    fn write_text(&self, text: &str) -> eyre::Result<()> {
        lock(&self.contents).push(text.to_string());
        Ok(())
    }
}

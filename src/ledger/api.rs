//! Capabilities the orchestrator consumes.

use crate::{
    error::LedgerError,
    types::{Gift, GiftId, TokenMetadata},
};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::fmt::Debug;

/// Type alias for `Result<T, LedgerError>`
pub type Result<T> = core::result::Result<T, LedgerError>;

/// Outcome of waiting for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finality {
    /// The transaction was included and succeeded.
    Finalized,
    /// The transaction was included and reverted.
    Reverted {
        /// The revert reason, if it could be recovered.
        reason: Option<String>,
    },
}

/// Read-only access to the ledger.
#[async_trait]
pub trait GiftLedger: Debug + Send + Sync {
    /// Reads the raw gift stored under `id` in the escrow `contract`.
    ///
    /// Unknown ids return a zeroed [`Gift`].
    async fn gift(&self, contract: Address, id: GiftId) -> Result<Gift>;

    /// Reads how much of `token` the `spender` may move on behalf of `owner`.
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    /// Reads symbol and decimals of `token`.
    ///
    /// Missing values are reported as `None` rather than as an error.
    async fn token_metadata(&self, token: Address) -> TokenMetadata;
}

/// Submission of transactions on behalf of the connected account.
#[async_trait]
pub trait Transactor: Debug + Send + Sync {
    /// Approves `spender` to move exactly `amount` of `token`.
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<B256>;

    /// Calls `depositGift(id)` on `contract`, attaching `value`.
    async fn deposit(&self, contract: Address, id: GiftId, value: U256) -> Result<B256>;

    /// Waits until the transaction is included.
    async fn await_finality(&self, tx_hash: B256) -> Result<Finality>;
}

/// The connected wallet, read-only.
pub trait WalletSession: Debug + Send + Sync {
    /// The connected account, if any.
    fn connected_address(&self) -> Option<Address>;

    /// Whether an account is connected.
    fn is_connected(&self) -> bool {
        self.connected_address().is_some()
    }
}

/// A sink for copied text.
pub trait Clipboard: Debug + Send + Sync {
    /// Copies `text`.
    fn write_text(&self, text: &str) -> eyre::Result<()>;
}

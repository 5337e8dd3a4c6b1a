//! Depositor error types.
use crate::constants::USER_REJECTED_REQUEST_CODE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod ledger;
pub use ledger::LedgerError;

mod revert;
pub use revert::{RevertReason, decode_revert_data};

/// The error of a deposit session.
///
/// Every failure of an external call is classified into one of these at the orchestrator
/// boundary and stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum DepositError {
    /// The input was empty or no gift is selected.
    #[error("{0}")]
    InputInvalid(String),
    /// The operation needs a signing identity but none is connected.
    #[error("Please connect your wallet first")]
    WalletNotConnected,
    /// No gift exists under the code.
    #[error("Gift not found with this code")]
    NotFound,
    /// Reading from the ledger failed.
    #[error("Failed to fetch gift: {0}")]
    LedgerReadFailed(String),
    /// The gift has already been funded.
    #[error("This gift has already been deposited")]
    AlreadyDeposited,
    /// The user declined to sign.
    #[error("Transaction was rejected in the wallet")]
    TransactionRejectedByUser,
    /// The contract rejected the transaction.
    #[error("{0}")]
    ContractReverted(RevertReason),
    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl DepositError {
    /// An empty code was submitted.
    pub fn empty_code() -> Self {
        Self::InputInvalid("Please enter a gift code".into())
    }

    /// A deposit was requested without a gift to deposit into.
    pub fn no_gift_selected() -> Self {
        Self::InputInvalid("No gift selected".into())
    }

    /// Classifies the failure of a read.
    pub fn classify_read(err: LedgerError) -> Self {
        match err {
            LedgerError::WalletNotConnected => Self::WalletNotConnected,
            err => Self::LedgerReadFailed(err.to_string()),
        }
    }

    /// Classifies the failure of a transaction, from signing until finality.
    pub fn classify_write(err: LedgerError) -> Self {
        match err {
            LedgerError::WalletNotConnected => return Self::WalletNotConnected,
            LedgerError::Rejected(_) => return Self::TransactionRejectedByUser,
            LedgerError::Reverted(reason) => {
                return Self::ContractReverted(RevertReason::from_reason(reason));
            }
            _ => {}
        }

        let message = err.to_string();
        if err.rpc_code() == Some(USER_REJECTED_REQUEST_CODE) || is_user_rejection(&message) {
            return Self::TransactionRejectedByUser;
        }

        if let Some(reason) =
            RevertReason::from_message(&message).filter(RevertReason::is_circuit_breaker)
        {
            return Self::ContractReverted(reason);
        }

        if let Some(data) = err.revert_data() {
            return Self::ContractReverted(RevertReason::from_reason(decode_revert_data(&data)));
        }

        if let Some(reason) = RevertReason::from_message(&message) {
            return Self::ContractReverted(reason);
        }

        if message.is_empty() {
            Self::Unknown("An unknown error occurred".into())
        } else {
            Self::Unknown(message)
        }
    }
}

fn is_user_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("user rejected") || message.contains("user denied")
}

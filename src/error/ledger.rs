use alloy::{
    primitives::{B256, Bytes},
    providers::PendingTransactionError,
    rpc::json_rpc::ErrorPayload,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;

/// Errors returned by the ledger capabilities.
///
/// These are raw and get classified into a [`DepositError`](super::DepositError) by the
/// orchestrator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No signing identity is connected.
    #[error("no wallet connected")]
    WalletNotConnected,
    /// The signer declined the request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The transaction was included but reverted.
    #[error("transaction reverted{}", fmt_reason(.0))]
    Reverted(Option<String>),
    /// The transaction was not included in time.
    #[error("transaction {0} was not confirmed in time")]
    Dropped(B256),
    /// An error occurred talking to RPC.
    #[error(transparent)]
    Transport(#[from] RpcError<TransportErrorKind>),
    /// An error occurred calling a contract.
    #[error(transparent)]
    Contract(#[from] alloy::contract::Error),
    /// An error occurred watching a pending transaction.
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    /// Any other error.
    #[error(transparent)]
    Other(#[from] eyre::Error),
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason.as_deref().map(|reason| format!(": {reason}")).unwrap_or_default()
}

impl LedgerError {
    /// The JSON-RPC error response behind this error, if any.
    pub fn error_payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Transport(err)
            | Self::Contract(alloy::contract::Error::TransportError(err))
            | Self::PendingTransaction(PendingTransactionError::TransportError(err)) => {
                err.as_error_resp()
            }
            _ => None,
        }
    }

    /// The JSON-RPC error code, if any.
    pub fn rpc_code(&self) -> Option<i64> {
        self.error_payload().map(|payload| payload.code)
    }

    /// The revert data attached to the error response, if any.
    pub fn revert_data(&self) -> Option<Bytes> {
        self.error_payload().and_then(|payload| payload.as_revert_data())
    }
}

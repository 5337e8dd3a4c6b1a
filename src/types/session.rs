//! Observable state of a deposit session.

use super::{AssetInfo, GiftId, GiftRecord};
use crate::error::DepositError;
use alloy::primitives::{B256, U256};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Monotonic identifier of a session.
///
/// A new id is assigned on every lookup. Results of work started for an older id are discarded.
#[derive(
    Debug, Display, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SessionId(pub u64);

/// Phase of the deposit state machine.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// No gift has been looked up.
    #[default]
    Idle,
    /// The gift is being fetched.
    LookingUp,
    /// The gift exists and can be deposited, unless already deposited.
    Found,
    /// No gift exists under the code.
    NotFound,
    /// The lookup failed.
    LookupError,
    /// Reading the token allowance.
    CheckingAllowance,
    /// Waiting for the approval to be signed and sent.
    Approving,
    /// The approval was sent and is waiting to be included.
    AwaitingApprovalFinality,
    /// Waiting for the deposit to be signed and sent.
    Depositing,
    /// The deposit was sent and is waiting to be included.
    AwaitingDepositFinality,
    /// The deposit is final.
    Success,
    /// The deposit failed.
    Failed,
}

impl Phase {
    /// Whether a lookup is in flight.
    pub const fn is_looking_up(&self) -> bool {
        matches!(self, Self::LookingUp)
    }

    /// Whether a deposit is in flight.
    pub const fn is_depositing(&self) -> bool {
        matches!(
            self,
            Self::CheckingAllowance
                | Self::Approving
                | Self::AwaitingApprovalFinality
                | Self::Depositing
                | Self::AwaitingDepositFinality
        )
    }

    /// Whether no work is in flight for the session.
    pub const fn is_settled(&self) -> bool {
        !self.is_looking_up() && !self.is_depositing()
    }

    /// Whether the session has ended.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// A submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReference {
    /// Transaction hash.
    pub hash: B256,
    /// Link to the transaction in the block explorer.
    pub explorer_url: String,
    /// When the transaction was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl TxReference {
    /// Creates a reference for `hash`, linking to `{explorer}/tx/{hash}`.
    pub fn new(hash: B256, explorer: &str) -> Self {
        Self {
            hash,
            explorer_url: format!("{}/tx/{hash}", explorer.trim_end_matches('/')),
            submitted_at: Utc::now(),
        }
    }
}

/// Snapshot of the current deposit session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session id.
    pub id: SessionId,
    /// The code as entered.
    pub code: Option<String>,
    /// Id derived from the code.
    pub gift_id: Option<GiftId>,
    /// The gift, once found.
    pub gift: Option<GiftRecord>,
    /// Display information for the gift's asset.
    pub asset: Option<AssetInfo>,
    /// Last observed allowance of the connected account, token gifts only.
    pub allowance: Option<U256>,
    /// Current phase.
    pub phase: Phase,
    /// The current error, if any.
    pub error: Option<DepositError>,
    /// The approval transaction, if one was needed.
    pub approval_tx: Option<TxReference>,
    /// The deposit transaction.
    pub deposit_tx: Option<TxReference>,
}

impl Session {
    /// Creates an empty session.
    pub fn new(id: SessionId) -> Self {
        Self { id, ..Default::default() }
    }

    /// Creates a session for a lookup of `code`.
    pub fn looking_up(id: SessionId, code: &str) -> Self {
        Self {
            id,
            code: Some(code.to_string()),
            gift_id: Some(GiftId::from_code(code)),
            phase: Phase::LookingUp,
            ..Default::default()
        }
    }

    /// Moves to `phase`, recording `error`.
    pub fn fail(&mut self, phase: Phase, error: DepositError) {
        self.phase = phase;
        self.error = Some(error);
    }

    /// Whether a deposit may be started from this session.
    pub fn can_deposit(&self) -> bool {
        self.phase == Phase::Found && self.gift.as_ref().is_some_and(|gift| !gift.deposited)
    }
}

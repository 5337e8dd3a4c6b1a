//! Gift escrow contract types and interfaces.
//!
//! A gift is created on-chain with a recipient, an asset and an amount, and is addressed by the
//! keccak256 hash of a human-chosen code. Anyone who knows the code can fund it by calling
//! `depositGift`.

use super::FundingPath;
use alloy::{
    primitives::{Address, B256, U256, keccak256, wrap_fixed_bytes},
    sol,
};
use serde::{Deserialize, Serialize};

sol! {
    /// The gift struct as returned by `getGift`.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Gift {
        /// Address that funded the gift. Zero until deposited.
        address gifter;
        /// Address the gift is meant for.
        address recipient;
        /// Token address, or zero address for the native asset.
        address token;
        /// Amount in the smallest unit of the asset.
        uint256 amount;
        /// The code the gift id was derived from.
        string code;
        /// Content-addressed pointer to gift metadata.
        string ipfsLink;
        /// Address that claimed the gift, if any.
        address claimer;
        /// Deadline for the current claim.
        uint256 claimDeadline;
        /// Number of claim attempts.
        uint8 attempts;
        /// Whether the gift has been funded.
        bool deposited;
        /// Whether the gift has been claimed.
        bool claimed;
    }

    #[sol(rpc)]
    #[derive(Debug)]
    contract IGiftEscrow {
        /// Funds the gift `id`.
        ///
        /// For native gifts the amount must be attached as value. For token gifts the escrow
        /// must be approved to pull the amount beforehand.
        function depositGift(bytes32 id) external payable;

        /// Returns the gift stored under `id`, or a zeroed struct if there is none.
        function getGift(bytes32 id) external view returns (Gift memory);
    }
}

wrap_fixed_bytes! {
    /// Identifier of a gift, `keccak256` of its trimmed code.
    pub struct GiftId<32>;
}

impl GiftId {
    /// Derives the gift id from a code.
    ///
    /// Surrounding whitespace is ignored, so `" john42 "` and `"john42"` map to the same id.
    pub fn from_code(code: &str) -> Self {
        Self(keccak256(code.trim().as_bytes()))
    }

    /// Returns the id as a [`B256`].
    pub const fn as_b256(&self) -> B256 {
        self.0
    }
}

/// A gift that exists on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftRecord {
    /// Address that funded the gift, zero until deposited.
    pub depositor: Address,
    /// Address the gift is meant for.
    pub recipient: Address,
    /// Asset of the gift. [`Address::ZERO`] is the native asset.
    pub asset: Address,
    /// Amount in the smallest unit of the asset.
    pub amount: U256,
    /// The code as stored on-chain.
    pub code: String,
    /// Opaque metadata pointer.
    pub metadata_link: String,
    /// Address that claimed the gift.
    pub claimant: Address,
    /// Claim deadline.
    pub claim_deadline: U256,
    /// Number of claim attempts.
    pub attempt_count: u8,
    /// Whether the gift has been funded.
    pub deposited: bool,
    /// Whether the gift has been claimed.
    pub claimed: bool,
}

impl GiftRecord {
    /// Interprets a raw [`Gift`].
    ///
    /// The contract returns a zeroed struct for unknown ids, so a zero amount means the gift
    /// does not exist and `None` is returned.
    pub fn from_raw(gift: Gift) -> Option<Self> {
        if gift.amount.is_zero() {
            return None;
        }

        Some(Self {
            depositor: gift.gifter,
            recipient: gift.recipient,
            asset: gift.token,
            amount: gift.amount,
            code: gift.code,
            metadata_link: gift.ipfsLink,
            claimant: gift.claimer,
            claim_deadline: gift.claimDeadline,
            attempt_count: gift.attempts,
            deposited: gift.deposited,
            claimed: gift.claimed,
        })
    }

    /// Which funding path this gift takes.
    pub fn funding_path(&self) -> FundingPath {
        FundingPath::classify(self.asset)
    }

    /// Whether someone has funded this gift.
    pub fn has_depositor(&self) -> bool {
        !self.depositor.is_zero()
    }

    /// Whether the recipient is set.
    pub fn has_recipient(&self) -> bool {
        !self.recipient.is_zero()
    }
}

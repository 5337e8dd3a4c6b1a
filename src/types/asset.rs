use crate::constants::{FALLBACK_TOKEN_DECIMALS, FALLBACK_TOKEN_SYMBOL, NATIVE_DECIMALS};
use alloy::primitives::{Address, U256, utils::format_units};
use serde::{Deserialize, Serialize};

/// How a gift is funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "address")]
pub enum FundingPath {
    /// The chain's native asset, attached to the deposit as value.
    Native,
    /// An ERC-20 token that must be approved before the deposit.
    Token(Address),
}

impl FundingPath {
    /// Classifies an asset address. [`Address::ZERO`] denotes the native asset.
    pub fn classify(asset: Address) -> Self {
        if asset.is_zero() { Self::Native } else { Self::Token(asset) }
    }

    /// Whether it is native.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// The token address, if any.
    pub fn token(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Token(token) => Some(*token),
        }
    }
}

/// Token metadata as reported by the token contract.
///
/// Either field is `None` if the corresponding call failed or is not implemented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Token symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Token decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

/// Display information for the asset of a gift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// The funding path of the asset.
    pub path: FundingPath,
    /// Symbol to display next to amounts.
    pub symbol: String,
    /// Number of decimals of the smallest unit.
    pub decimals: u8,
}

impl AssetInfo {
    /// The native asset of a chain.
    pub fn native(symbol: impl Into<String>) -> Self {
        Self { path: FundingPath::Native, symbol: symbol.into(), decimals: NATIVE_DECIMALS }
    }

    /// A token, falling back to 18 decimals and a generic symbol for missing metadata.
    pub fn token(address: Address, metadata: TokenMetadata) -> Self {
        Self {
            path: FundingPath::Token(address),
            symbol: metadata.symbol.unwrap_or_else(|| FALLBACK_TOKEN_SYMBOL.to_string()),
            decimals: metadata.decimals.unwrap_or(FALLBACK_TOKEN_DECIMALS),
        }
    }

    /// Formats `amount` in whole units, e.g. `5.000000000000000000`.
    pub fn format_amount(&self, amount: U256) -> String {
        format_units(amount, self.decimals).unwrap_or_else(|_| amount.to_string())
    }

    /// Formats `amount` in whole units followed by the symbol.
    pub fn display_amount(&self, amount: U256) -> String {
        format!("{} {}", self.format_amount(amount), self.symbol)
    }
}

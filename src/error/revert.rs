use alloy::sol_types::{Revert, SolError, decode_revert_reason};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a contract rejected a transaction.
///
/// Circuit-breaker detection is a heuristic on the message text reported by the node or wallet,
/// there is no standard error for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum RevertReason {
    /// The error message mentions the token's circuit breaker.
    CircuitBreaker,
    /// The extracted revert reason mentions the token's circuit breaker.
    CircuitBreakerReason,
    /// A human-readable revert reason.
    Reason(String),
    /// The transaction reverted without a reason we could extract.
    Unspecified,
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitBreaker => f.write_str(
                "Token transfers are currently paused. The token contract has activated its \
                 circuit breaker (safety mechanism). Please try again later or contact the token \
                 issuer.",
            ),
            Self::CircuitBreakerReason => f.write_str(
                "Token transfers are paused. Circuit breaker is active. Please try again later.",
            ),
            Self::Reason(reason) => write!(f, "Transaction failed: {reason}"),
            Self::Unspecified => f.write_str(
                "Transaction was rejected by the token contract. Please check your balance and \
                 try again.",
            ),
        }
    }
}

impl RevertReason {
    /// Interprets a raw error message.
    ///
    /// Returns `None` if the message neither mentions a circuit breaker nor a revert.
    pub fn from_message(message: &str) -> Option<Self> {
        if mentions_circuit_breaker(message) {
            return Some(Self::CircuitBreaker);
        }

        if !message.to_lowercase().contains("revert") {
            return None;
        }

        Some(Self::from_reason(extract_reason(message)))
    }

    /// Interprets an extracted revert reason.
    pub fn from_reason(reason: Option<impl AsRef<str>>) -> Self {
        match reason.as_ref().map(|reason| reason.as_ref().trim()) {
            Some(reason) if mentions_circuit_breaker(reason) => Self::CircuitBreakerReason,
            Some(reason) if !reason.is_empty() => Self::Reason(reason.to_string()),
            _ => Self::Unspecified,
        }
    }

    /// Whether this is a circuit-breaker revert.
    pub fn is_circuit_breaker(&self) -> bool {
        matches!(self, Self::CircuitBreaker | Self::CircuitBreakerReason)
    }
}

/// Decodes revert data into a reason, preferring the bare reason of an `Error(string)` revert.
pub fn decode_revert_data(data: &[u8]) -> Option<String> {
    Revert::abi_decode(data).map(|revert| revert.reason).ok().or_else(|| decode_revert_reason(data))
}

/// Whether `text` mentions a circuit breaker, ignoring case, spaces and underscores.
fn mentions_circuit_breaker(text: &str) -> bool {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_lowercase()
        .contains("circuitbreaker")
}

/// Extracts a revert reason from an error message.
///
/// Understands `reason: <text>` / `reason <text>` as emitted by wallets, and
/// `execution reverted: <text>` as emitted by nodes. The reason ends at the first newline.
fn extract_reason(message: &str) -> Option<&str> {
    after_marker(message, "reason").or_else(|| after_marker(message, "reverted:"))
}

fn after_marker<'a>(message: &'a str, marker: &str) -> Option<&'a str> {
    let start = message.to_ascii_lowercase().find(marker)? + marker.len();
    let rest = message[start..].strip_prefix(':').unwrap_or(&message[start..]);
    let rest = rest.trim_start();
    let reason = rest.split('\n').next().unwrap_or_default().trim_end();

    (!reason.is_empty()).then_some(reason)
}

//! Depositor constants.

use alloy::primitives::{Address, address};
use std::time::Duration;

/// Decimals of the native asset on every supported chain.
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimals assumed for a token whose `decimals()` call fails.
pub const FALLBACK_TOKEN_DECIMALS: u8 = 18;

/// Symbol shown for a token whose `symbol()` call fails.
pub const FALLBACK_TOKEN_SYMBOL: &str = "TOKEN";

/// Number of automatic retries of a failed gift lookup.
///
/// A lookup is attempted at most `1 + DEFAULT_LOOKUP_RETRIES` times.
pub const DEFAULT_LOOKUP_RETRIES: u32 = 2;

/// Initial delay between lookup retries. Doubles on every retry.
pub const DEFAULT_LOOKUP_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// How long a successful deposit stays visible before the session is reset.
pub const DEFAULT_SUCCESS_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// How long to wait for a submitted transaction to be included.
pub const DEFAULT_FINALITY_TIMEOUT: Duration = Duration::from_secs(120);

/// Poll interval of the RPC client and of the allowance re-check.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Number of allowance reads after an approval is final before giving up.
pub const DEFAULT_ALLOWANCE_RECHECK_ATTEMPTS: u32 = 3;

/// Number of confirmations a transaction needs before it is considered final.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 1;

/// Address of the gift escrow contract on Somnia testnet.
pub const SOMNIA_TESTNET_GIFT_CONTRACT: Address =
    address!("0x2e56899276A3020AC5522D2f21DB880ae7c49632");

/// Somnia testnet chain id.
pub const SOMNIA_TESTNET_CHAIN_ID: u64 = 50312;

/// Public Somnia testnet RPC URL.
pub const SOMNIA_TESTNET_RPC_URL: &str = "https://rpc.ankr.com/somnia_testnet";

/// Somnia testnet native asset symbol.
pub const SOMNIA_TESTNET_NATIVE_SYMBOL: &str = "STT";

/// Somnia testnet block explorer.
pub const SOMNIA_TESTNET_EXPLORER_URL: &str = "https://shannon-explorer.somnia.network";

/// Somnia mainnet chain id.
pub const SOMNIA_MAINNET_CHAIN_ID: u64 = 50311;

/// Public Somnia mainnet RPC URL.
pub const SOMNIA_MAINNET_RPC_URL: &str = "https://somnia.publicnode.com";

/// Somnia mainnet native asset symbol.
pub const SOMNIA_MAINNET_NATIVE_SYMBOL: &str = "SOMI";

/// Somnia mainnet block explorer.
pub const SOMNIA_MAINNET_EXPLORER_URL: &str = "https://explorer.somnia.network";

/// JSON-RPC error code a wallet returns when the user declines a request (EIP-1193).
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;

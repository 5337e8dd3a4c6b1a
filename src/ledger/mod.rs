//! Access to the chain: reading gifts, submitting transactions and the connected wallet.

mod api;
pub use api::*;

mod memory;
pub use memory::{InMemoryClipboard, InMemoryLedger, LedgerCall};

mod rpc;
pub use rpc::*;

mod clipboard;
pub use clipboard::Osc52Clipboard;

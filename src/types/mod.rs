//! Shared primitive types.
mod asset;
pub use asset::*;

mod erc20;
pub use erc20::*;

mod gift;
pub use gift::*;

mod session;
pub use session::*;

//! # Depositor
//!
//! Library for looking up gifts held in an on-chain escrow and funding them.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod serde;
pub mod spawn;
pub mod types;

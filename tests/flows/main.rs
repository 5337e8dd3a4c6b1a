//! Deposit flow tests against the in-memory ledger.
#![allow(missing_docs)]

mod deposit;
mod errors;
mod lookup;

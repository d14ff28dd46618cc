//! GigRail Wallet Ledger
//!
//! Per-user wallet balances (spendable + escrow-locked) backed by an
//! append-only transaction log.
//!
//! # Invariants
//!
//! - Non-negative balances: `balance >= 0` and `escrow_balance >= 0` always
//! - Money conservation: transfers move funds, only deposits/withdrawals/
//!   admin adjustments change the system-wide total
//! - Append-only: transaction rows are never modified after commit, except
//!   the `status` of a pending withdrawal
//! - Every balance change carries exactly one log row (two for transfers)
//!   whose `balance_after` snapshot matches a balance that really existed

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod txn;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use txn::LedgerTxn;
pub use types::{
    Currency, TransactionStatus, TransactionType, TxnReference, Wallet, WalletTransaction,
    WithdrawalBlock,
};

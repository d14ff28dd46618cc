//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Amount failed validation (non-positive, zero delta, negative result)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Spendable balance below the requested amount
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Spendable balance at the time of the check
        available: Decimal,
        /// Amount the operation asked for
        requested: Decimal,
    },

    /// Escrow balance below the requested amount
    #[error("Insufficient escrow: available {available}, requested {requested}")]
    InsufficientEscrow {
        /// Escrow balance at the time of the check
        available: Decimal,
        /// Amount the operation asked for
        requested: Decimal,
    },

    /// Withdrawals are administratively frozen for this wallet
    #[error("Withdrawals blocked: {reason}")]
    WithdrawalsBlocked {
        /// Reason recorded when the block was set
        reason: String,
    },

    /// Transaction row not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction row is not in a state that permits the operation
    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),

    /// Invariant violation (non-negative balances, log completeness)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

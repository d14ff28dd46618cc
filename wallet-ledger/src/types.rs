//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - An immutable audit trail: balances are a cache of the transaction log

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// Indian Rupee
    INR,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::INR => "INR",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "INR" => Some(Currency::INR),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Per-user wallet: spendable balance plus escrow-locked balance
///
/// Created lazily on first reference, never deleted. Mutated exclusively
/// through [`crate::LedgerTxn`] operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet ID
    pub wallet_id: Uuid,

    /// Owning user (one wallet per user)
    pub user_id: Uuid,

    /// Freely spendable balance (never negative)
    pub balance: Decimal,

    /// Escrow-locked balance (never negative)
    pub escrow_balance: Decimal,

    /// Wallet currency
    pub currency: Currency,

    /// Withdrawal block, if an administrator has frozen payouts
    pub withdrawals_blocked: Option<WithdrawalBlock>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a fresh zero-balance wallet
    pub fn new(user_id: Uuid, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            wallet_id: Uuid::new_v4(),
            user_id,
            balance: Decimal::ZERO,
            escrow_balance: Decimal::ZERO,
            currency,
            withdrawals_blocked: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total funds owned by this user (derived, never stored)
    pub fn total_owned(&self) -> Decimal {
        self.balance + self.escrow_balance
    }
}

/// Administrative withdrawal freeze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalBlock {
    /// Human-readable reason for the block
    pub reason: String,
    /// Administrator who set the block
    pub blocked_by: Uuid,
    /// When the block was set
    pub blocked_at: DateTime<Utc>,
}

/// Balance-affecting event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionType {
    /// Externally verified deposit credited to the spendable balance
    Deposit = 1,
    /// Spendable funds moved into escrow
    EscrowHold = 2,
    /// Escrowed funds released to the earning party
    EscrowRelease = 3,
    /// Escrowed funds returned to the paying party's spendable balance
    EscrowRefund = 4,
    /// Withdrawal request (pending until the external payout settles)
    Withdrawal = 5,
    /// Reversal of a withdrawal rejected by the external payout rail
    WithdrawalReversal = 6,
    /// Administrative balance correction
    AdminAdjustment = 7,
    /// Administrative reversal of funds already credited to a party
    AdminClawback = 8,
}

/// Transaction row status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Awaiting external settlement (withdrawals only)
    Pending = 1,
    /// Applied and final
    Completed = 2,
    /// Rejected before application
    Failed = 3,
    /// Pending withdrawal reversed after external rejection
    Reversed = 4,
}

/// Typed reference to the entity that caused a transaction
///
/// A closed set instead of an untyped id field, so lookups stay type-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnReference {
    /// Marketplace project
    Project(Uuid),
    /// Signed agreement
    Agreement(Uuid),
    /// Milestone within a project
    Milestone(Uuid),
    /// Dispute whose resolution moved the funds
    Dispute(Uuid),
    /// The withdrawal row a reversal undoes
    Withdrawal(Uuid),
    /// External payment-gateway id (doubles as the caller's idempotency key)
    ExternalPayment(String),
}

/// Append-only audit row, one per balance-affecting event
///
/// Never updated after creation except `status` transitioning
/// Pending -> Completed/Reversed for withdrawals. Balances are a cache of
/// this log, not the other way around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Unique row ID (UUIDv7 for time-ordering)
    pub transaction_id: Uuid,

    /// Wallet this row belongs to
    pub wallet_id: Uuid,

    /// Wallet owner
    pub user_id: Uuid,

    /// Event kind
    pub tx_type: TransactionType,

    /// Signed amount: positive = credit, negative = debit
    pub amount: Decimal,

    /// Spendable balance immediately after this event
    pub balance_after: Decimal,

    /// Escrow balance immediately after this event
    pub escrow_balance_after: Decimal,

    /// Row status
    pub status: TransactionStatus,

    /// Entity that caused this event, if any
    pub reference: Option<TxnReference>,

    /// Escrow record involved, if any
    pub escrow_id: Option<Uuid>,

    /// Human-readable description
    pub description: String,

    /// Administrator who performed the operation, for override paths
    pub performed_by: Option<Uuid>,

    /// Row creation timestamp
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// True once no further status transition is permitted
    pub fn is_final(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Reversed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("USD"), Some(Currency::USD));
        assert_eq!(Currency::parse("GBP"), Some(Currency::GBP));
        assert_eq!(Currency::parse("XXX"), None);
    }

    #[test]
    fn test_new_wallet_is_empty() {
        let wallet = Wallet::new(Uuid::new_v4(), Currency::USD);
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.escrow_balance, Decimal::ZERO);
        assert_eq!(wallet.total_owned(), Decimal::ZERO);
        assert!(wallet.withdrawals_blocked.is_none());
    }

    #[test]
    fn test_total_owned_is_derived() {
        let mut wallet = Wallet::new(Uuid::new_v4(), Currency::EUR);
        wallet.balance = Decimal::new(40000, 2);
        wallet.escrow_balance = Decimal::new(60000, 2);
        assert_eq!(wallet.total_owned(), Decimal::new(100000, 2));
    }

    #[test]
    fn test_transaction_finality() {
        let row = WalletTransaction {
            transaction_id: Uuid::now_v7(),
            wallet_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            tx_type: TransactionType::Withdrawal,
            amount: Decimal::new(-5000, 2),
            balance_after: Decimal::ZERO,
            escrow_balance_after: Decimal::ZERO,
            status: TransactionStatus::Pending,
            reference: None,
            escrow_id: None,
            description: "payout".to_string(),
            performed_by: None,
            created_at: Utc::now(),
        };
        assert!(!row.is_final());

        let mut reversed = row;
        reversed.status = TransactionStatus::Reversed;
        assert!(reversed.is_final());
    }
}

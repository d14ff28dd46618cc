//! High-level ledger facade
//!
//! One-shot wrappers over [`crate::LedgerTxn`] for callers that do not need
//! to compose multiple operations into a single atomic unit, plus the read
//! surfaces (wallet snapshot, paginated history).
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//! use wallet_ledger::{Config, Ledger};
//!
//! fn main() -> wallet_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!     let wallet = ledger.credit(Uuid::new_v4(), Decimal::new(10000, 2), "deposit", None)?;
//!     println!("balance: {}", wallet.balance);
//!     Ok(())
//! }
//! ```

use crate::{
    types::{TxnReference, Wallet, WalletTransaction},
    Config, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Main ledger interface
pub struct Ledger {
    storage: Arc<Storage>,
}

impl Ledger {
    /// Open the ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self {
            storage: Arc::new(Storage::open(&config, &[])?),
        })
    }

    /// Wrap an already-open storage (shared with a document layer)
    pub fn with_storage(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Shared storage handle
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    // One-shot operations

    /// Credit a verified deposit
    pub fn credit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        description: &str,
        reference: Option<TxnReference>,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.credit(user_id, amount, description, reference)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Move spendable funds into escrow
    pub fn hold_escrow(
        &self,
        client_id: Uuid,
        amount: Decimal,
        escrow_id: Uuid,
        project_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.hold_escrow(client_id, amount, escrow_id, project_id, description)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Release escrowed funds to the earning party
    pub fn release_escrow(
        &self,
        client_id: Uuid,
        freelancer_id: Uuid,
        amount: Decimal,
        escrow_id: Uuid,
        reference: TxnReference,
        description: &str,
    ) -> Result<(Wallet, Wallet)> {
        let mut txn = self.storage.begin();
        let wallets = txn.release_escrow(
            client_id,
            freelancer_id,
            amount,
            escrow_id,
            reference,
            description,
        )?;
        txn.commit()?;
        Ok(wallets)
    }

    /// Return escrowed funds to the paying party
    pub fn refund_escrow(
        &self,
        client_id: Uuid,
        amount: Decimal,
        escrow_id: Uuid,
        project_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.refund_escrow(client_id, amount, escrow_id, project_id, description)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Debit the spendable balance for a withdrawal request
    pub fn debit_wallet(
        &self,
        user_id: Uuid,
        amount: Decimal,
        reference: TxnReference,
        description: &str,
    ) -> Result<(Wallet, WalletTransaction)> {
        let mut txn = self.storage.begin();
        let out = txn.debit_wallet(user_id, amount, reference, description)?;
        txn.commit()?;
        Ok(out)
    }

    /// Mark a pending withdrawal settled
    pub fn complete_withdrawal(&self, withdrawal_id: Uuid) -> Result<WalletTransaction> {
        let mut txn = self.storage.begin();
        let row = txn.complete_withdrawal(withdrawal_id)?;
        txn.commit()?;
        Ok(row)
    }

    /// Undo a withdrawal rejected by the external payout rail
    pub fn reverse_withdrawal(
        &self,
        user_id: Uuid,
        amount: Decimal,
        withdrawal_id: Uuid,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.reverse_withdrawal(user_id, amount, withdrawal_id)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Administrative balance correction
    pub fn admin_adjust_wallet(
        &self,
        user_id: Uuid,
        delta: Decimal,
        admin_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.admin_adjust_wallet(user_id, delta, admin_id, description)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Administrative clawback of credited funds
    pub fn admin_clawback(
        &self,
        freelancer_id: Uuid,
        client_id: Uuid,
        amount: Decimal,
        project_id: Uuid,
        admin_id: Uuid,
        reason: &str,
    ) -> Result<(Wallet, Wallet)> {
        let mut txn = self.storage.begin();
        let wallets =
            txn.admin_clawback(freelancer_id, client_id, amount, project_id, admin_id, reason)?;
        txn.commit()?;
        Ok(wallets)
    }

    /// Freeze withdrawals for a wallet
    pub fn block_withdrawals(&self, user_id: Uuid, reason: &str, admin_id: Uuid) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.block_withdrawals(user_id, reason, admin_id)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Lift a withdrawal freeze
    pub fn unblock_withdrawals(&self, user_id: Uuid) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.unblock_withdrawals(user_id)?;
        txn.commit()?;
        Ok(wallet)
    }

    // Read surfaces

    /// Wallet snapshot (None until first referenced)
    pub fn wallet(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        self.storage.get_wallet(user_id)
    }

    /// Paginated transaction history, oldest first
    pub fn transactions(
        &self,
        user_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>> {
        self.storage.wallet_transactions(user_id, offset, limit)
    }

    /// Single transaction row by ID
    pub fn transaction(&self, transaction_id: Uuid) -> Result<WalletTransaction> {
        self.storage.get_transaction(transaction_id)
    }
}

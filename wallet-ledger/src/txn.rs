//! Atomic ledger transactions
//!
//! Every wallet mutation goes through a [`LedgerTxn`]: a commit-locked unit
//! that stages writes into a RocksDB `WriteBatch` and applies them
//! all-or-nothing on [`LedgerTxn::commit`]. Dropping the handle without
//! committing discards every staged write.
//!
//! The commit lock is held from [`Storage::begin`] until commit, so the
//! sufficiency checks each operation performs are race-free: two concurrent
//! operations on the same wallet serialize, and the second observes the
//! first's committed balances. Partial application of a multi-wallet
//! operation (crediting one side without debiting the other) cannot occur.

use crate::{
    storage::{CF_INDICES, CF_TRANSACTIONS, CF_WALLETS},
    types::{TransactionStatus, TransactionType, TxnReference, Wallet, WalletTransaction},
    Error, Result, Storage,
};
use chrono::Utc;
use parking_lot::MutexGuard;
use rocksdb::WriteBatch;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use uuid::Uuid;

/// In-flight atomic ledger transaction
pub struct LedgerTxn<'a> {
    storage: &'a Storage,
    _guard: MutexGuard<'a, ()>,
    batch: WriteBatch,

    /// Wallets touched in this unit, so sequential operations compose
    wallets: HashMap<Uuid, Wallet>,
}

impl Storage {
    /// Begin an atomic transaction, acquiring the commit lock
    pub fn begin(&self) -> LedgerTxn<'_> {
        LedgerTxn {
            storage: self,
            _guard: self.write_lock.lock(),
            batch: WriteBatch::default(),
            wallets: HashMap::new(),
        }
    }
}

impl LedgerTxn<'_> {
    /// Current view of a wallet: staged if touched in this unit, committed
    /// otherwise, lazily created on first reference.
    fn wallet_for_update(&mut self, user_id: Uuid) -> Result<Wallet> {
        if let Some(wallet) = self.wallets.get(&user_id) {
            return Ok(wallet.clone());
        }
        match self.storage.get_wallet(user_id)? {
            Some(wallet) => Ok(wallet),
            None => Ok(Wallet::new(user_id, self.storage.default_currency)),
        }
    }

    /// Stage a wallet snapshot write
    fn stage_wallet(&mut self, mut wallet: Wallet) -> Result<Wallet> {
        if wallet.balance < Decimal::ZERO || wallet.escrow_balance < Decimal::ZERO {
            return Err(Error::InvariantViolation(format!(
                "Negative balance staged for wallet {}",
                wallet.wallet_id
            )));
        }
        wallet.updated_at = Utc::now();

        let cf = self.storage.cf_handle(CF_WALLETS)?;
        let value = bincode::serialize(&wallet)?;
        self.batch.put_cf(cf, wallet.user_id.as_bytes(), &value);

        self.wallets.insert(wallet.user_id, wallet.clone());
        Ok(wallet)
    }

    /// Stage an audit-log row plus its user index entry
    fn append_row(&mut self, row: &WalletTransaction) -> Result<()> {
        let cf_txns = self.storage.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(row)?;
        self.batch.put_cf(cf_txns, row.transaction_id.as_bytes(), &value);

        let cf_indices = self.storage.cf_handle(CF_INDICES)?;
        let seq = self.storage.row_seq.fetch_add(1, Ordering::SeqCst);
        let nanos = row.created_at.timestamp_nanos_opt().unwrap_or(0);
        let idx = Storage::index_key_user_txn(&row.user_id, nanos, seq);
        self.batch
            .put_cf(cf_indices, &idx, row.transaction_id.as_bytes());

        tracing::debug!(
            transaction_id = %row.transaction_id,
            user_id = %row.user_id,
            tx_type = ?row.tx_type,
            amount = %row.amount,
            "Ledger row appended"
        );

        Ok(())
    }

    fn new_row(
        wallet: &Wallet,
        tx_type: TransactionType,
        amount: Decimal,
        status: TransactionStatus,
        reference: Option<TxnReference>,
        escrow_id: Option<Uuid>,
        description: &str,
        performed_by: Option<Uuid>,
    ) -> WalletTransaction {
        WalletTransaction {
            transaction_id: Uuid::now_v7(),
            wallet_id: wallet.wallet_id,
            user_id: wallet.user_id,
            tx_type,
            amount,
            balance_after: wallet.balance,
            escrow_balance_after: wallet.escrow_balance,
            status,
            reference,
            escrow_id,
            description: description.to_string(),
            performed_by,
            created_at: Utc::now(),
        }
    }

    fn require_positive(amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }
        Ok(())
    }

    // Ledger operations

    /// Credit an externally verified deposit to the spendable balance.
    ///
    /// Never fails on balance grounds. Idempotency for redelivered
    /// confirmations is the caller's responsibility via the reference key.
    pub fn credit(
        &mut self,
        user_id: Uuid,
        amount: Decimal,
        description: &str,
        reference: Option<TxnReference>,
    ) -> Result<Wallet> {
        Self::require_positive(amount)?;

        let mut wallet = self.wallet_for_update(user_id)?;
        wallet.balance += amount;
        let wallet = self.stage_wallet(wallet)?;

        let row = Self::new_row(
            &wallet,
            TransactionType::Deposit,
            amount,
            TransactionStatus::Completed,
            reference,
            None,
            description,
            None,
        );
        self.append_row(&row)?;

        Ok(wallet)
    }

    /// Move spendable funds into escrow.
    ///
    /// The sufficiency check happens under the commit lock, so a concurrent
    /// hold against the same wallet cannot double-spend the balance.
    pub fn hold_escrow(
        &mut self,
        client_id: Uuid,
        amount: Decimal,
        escrow_id: Uuid,
        project_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        Self::require_positive(amount)?;

        let mut wallet = self.wallet_for_update(client_id)?;
        if wallet.balance < amount {
            return Err(Error::InsufficientFunds {
                available: wallet.balance,
                requested: amount,
            });
        }
        wallet.balance -= amount;
        wallet.escrow_balance += amount;
        let wallet = self.stage_wallet(wallet)?;

        let row = Self::new_row(
            &wallet,
            TransactionType::EscrowHold,
            amount,
            TransactionStatus::Completed,
            Some(TxnReference::Project(project_id)),
            Some(escrow_id),
            description,
            None,
        );
        self.append_row(&row)?;

        Ok(wallet)
    }

    /// Release escrowed funds from the client to the freelancer.
    ///
    /// Writes two paired rows (debit, credit) sharing the same reference so
    /// they can be reconciled as a pair.
    pub fn release_escrow(
        &mut self,
        client_id: Uuid,
        freelancer_id: Uuid,
        amount: Decimal,
        escrow_id: Uuid,
        reference: TxnReference,
        description: &str,
    ) -> Result<(Wallet, Wallet)> {
        Self::require_positive(amount)?;

        let mut client = self.wallet_for_update(client_id)?;
        if client.escrow_balance < amount {
            return Err(Error::InsufficientEscrow {
                available: client.escrow_balance,
                requested: amount,
            });
        }
        client.escrow_balance -= amount;
        let client = self.stage_wallet(client)?;

        let mut freelancer = self.wallet_for_update(freelancer_id)?;
        freelancer.balance += amount;
        let freelancer = self.stage_wallet(freelancer)?;

        let debit = Self::new_row(
            &client,
            TransactionType::EscrowRelease,
            -amount,
            TransactionStatus::Completed,
            Some(reference.clone()),
            Some(escrow_id),
            description,
            None,
        );
        self.append_row(&debit)?;

        let credit = Self::new_row(
            &freelancer,
            TransactionType::EscrowRelease,
            amount,
            TransactionStatus::Completed,
            Some(reference),
            Some(escrow_id),
            description,
            None,
        );
        self.append_row(&credit)?;

        Ok((client, freelancer))
    }

    /// Return escrowed funds to the client's spendable balance
    pub fn refund_escrow(
        &mut self,
        client_id: Uuid,
        amount: Decimal,
        escrow_id: Uuid,
        project_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        Self::require_positive(amount)?;

        let mut wallet = self.wallet_for_update(client_id)?;
        if wallet.escrow_balance < amount {
            return Err(Error::InsufficientEscrow {
                available: wallet.escrow_balance,
                requested: amount,
            });
        }
        wallet.escrow_balance -= amount;
        wallet.balance += amount;
        let wallet = self.stage_wallet(wallet)?;

        let row = Self::new_row(
            &wallet,
            TransactionType::EscrowRefund,
            amount,
            TransactionStatus::Completed,
            Some(TxnReference::Project(project_id)),
            Some(escrow_id),
            description,
            None,
        );
        self.append_row(&row)?;

        Ok(wallet)
    }

    /// Debit the spendable balance for a withdrawal request.
    ///
    /// The row stays Pending until the external payout settles; the caller
    /// then flips it with [`LedgerTxn::complete_withdrawal`] or undoes the
    /// debit with [`LedgerTxn::reverse_withdrawal`].
    pub fn debit_wallet(
        &mut self,
        user_id: Uuid,
        amount: Decimal,
        reference: TxnReference,
        description: &str,
    ) -> Result<(Wallet, WalletTransaction)> {
        Self::require_positive(amount)?;

        let mut wallet = self.wallet_for_update(user_id)?;
        if let Some(block) = &wallet.withdrawals_blocked {
            return Err(Error::WithdrawalsBlocked {
                reason: block.reason.clone(),
            });
        }
        if wallet.balance < amount {
            return Err(Error::InsufficientFunds {
                available: wallet.balance,
                requested: amount,
            });
        }
        wallet.balance -= amount;
        let wallet = self.stage_wallet(wallet)?;

        let row = Self::new_row(
            &wallet,
            TransactionType::Withdrawal,
            -amount,
            TransactionStatus::Pending,
            Some(reference),
            None,
            description,
            None,
        );
        self.append_row(&row)?;

        Ok((wallet, row))
    }

    /// Mark a pending withdrawal row Completed once the payout settles.
    ///
    /// Status is the only field a committed row may change.
    pub fn complete_withdrawal(&mut self, withdrawal_id: Uuid) -> Result<WalletTransaction> {
        let mut row = self.storage.get_transaction(withdrawal_id)?;
        if row.tx_type != TransactionType::Withdrawal
            || row.status != TransactionStatus::Pending
        {
            return Err(Error::InvalidTransactionState(format!(
                "Transaction {} is not a pending withdrawal",
                withdrawal_id
            )));
        }
        row.status = TransactionStatus::Completed;

        let cf = self.storage.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(&row)?;
        self.batch.put_cf(cf, row.transaction_id.as_bytes(), &value);

        Ok(row)
    }

    /// Undo a withdrawal the external payout rail rejected.
    ///
    /// Credits the balance back, flips the original row to Reversed, and
    /// appends a reversal row referencing it.
    pub fn reverse_withdrawal(
        &mut self,
        user_id: Uuid,
        amount: Decimal,
        withdrawal_id: Uuid,
    ) -> Result<Wallet> {
        Self::require_positive(amount)?;

        let mut original = self.storage.get_transaction(withdrawal_id)?;
        if original.user_id != user_id
            || original.tx_type != TransactionType::Withdrawal
            || original.status != TransactionStatus::Pending
        {
            return Err(Error::InvalidTransactionState(format!(
                "Transaction {} is not a pending withdrawal for this user",
                withdrawal_id
            )));
        }
        if -original.amount != amount {
            return Err(Error::InvalidAmount(format!(
                "Reversal amount {} does not match withdrawal of {}",
                amount, original.amount
            )));
        }

        original.status = TransactionStatus::Reversed;
        let cf = self.storage.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(&original)?;
        self.batch
            .put_cf(cf, original.transaction_id.as_bytes(), &value);

        let mut wallet = self.wallet_for_update(user_id)?;
        wallet.balance += amount;
        let wallet = self.stage_wallet(wallet)?;

        let row = Self::new_row(
            &wallet,
            TransactionType::WithdrawalReversal,
            amount,
            TransactionStatus::Completed,
            Some(TxnReference::Withdrawal(withdrawal_id)),
            None,
            "Withdrawal rejected by payout rail",
            None,
        );
        self.append_row(&row)?;

        Ok(wallet)
    }

    /// Administrative balance correction.
    ///
    /// Bypasses the sufficiency guard (the delta may be negative) but still
    /// writes a full audit row, and may not drive the balance below zero.
    pub fn admin_adjust_wallet(
        &mut self,
        user_id: Uuid,
        delta: Decimal,
        admin_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        if delta == Decimal::ZERO {
            return Err(Error::InvalidAmount("Adjustment delta is zero".to_string()));
        }

        let mut wallet = self.wallet_for_update(user_id)?;
        let new_balance = wallet.balance + delta;
        if new_balance < Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "Adjustment of {} would leave balance at {}",
                delta, new_balance
            )));
        }
        wallet.balance = new_balance;
        let wallet = self.stage_wallet(wallet)?;

        let row = Self::new_row(
            &wallet,
            TransactionType::AdminAdjustment,
            delta,
            TransactionStatus::Completed,
            None,
            None,
            description,
            Some(admin_id),
        );
        self.append_row(&row)?;

        tracing::info!(
            user_id = %user_id,
            delta = %delta,
            admin_id = %admin_id,
            "Administrative wallet adjustment"
        );

        Ok(wallet)
    }

    /// Administrative reversal of funds already credited to the freelancer.
    ///
    /// Debits the freelancer's spendable balance (ignoring any withdrawal
    /// block) and credits the client. Funds already withdrawn cannot be
    /// clawed back by this path and surface as `InsufficientFunds`.
    pub fn admin_clawback(
        &mut self,
        freelancer_id: Uuid,
        client_id: Uuid,
        amount: Decimal,
        project_id: Uuid,
        admin_id: Uuid,
        reason: &str,
    ) -> Result<(Wallet, Wallet)> {
        Self::require_positive(amount)?;

        let mut freelancer = self.wallet_for_update(freelancer_id)?;
        if freelancer.balance < amount {
            return Err(Error::InsufficientFunds {
                available: freelancer.balance,
                requested: amount,
            });
        }
        freelancer.balance -= amount;
        let freelancer = self.stage_wallet(freelancer)?;

        let mut client = self.wallet_for_update(client_id)?;
        client.balance += amount;
        let client = self.stage_wallet(client)?;

        let debit = Self::new_row(
            &freelancer,
            TransactionType::AdminClawback,
            -amount,
            TransactionStatus::Completed,
            Some(TxnReference::Project(project_id)),
            None,
            reason,
            Some(admin_id),
        );
        self.append_row(&debit)?;

        let credit = Self::new_row(
            &client,
            TransactionType::AdminClawback,
            amount,
            TransactionStatus::Completed,
            Some(TxnReference::Project(project_id)),
            None,
            reason,
            Some(admin_id),
        );
        self.append_row(&credit)?;

        tracing::info!(
            freelancer_id = %freelancer_id,
            client_id = %client_id,
            amount = %amount,
            admin_id = %admin_id,
            "Administrative clawback"
        );

        Ok((freelancer, client))
    }

    /// Freeze withdrawals for a wallet (administrative)
    pub fn block_withdrawals(
        &mut self,
        user_id: Uuid,
        reason: &str,
        admin_id: Uuid,
    ) -> Result<Wallet> {
        let mut wallet = self.wallet_for_update(user_id)?;
        wallet.withdrawals_blocked = Some(crate::types::WithdrawalBlock {
            reason: reason.to_string(),
            blocked_by: admin_id,
            blocked_at: Utc::now(),
        });
        self.stage_wallet(wallet)
    }

    /// Lift a withdrawal freeze (administrative)
    pub fn unblock_withdrawals(&mut self, user_id: Uuid) -> Result<Wallet> {
        let mut wallet = self.wallet_for_update(user_id)?;
        wallet.withdrawals_blocked = None;
        self.stage_wallet(wallet)
    }

    // Document staging (for callers composing agreements/escrows into the
    // same atomic unit)

    /// Stage a raw put into a document column family
    pub fn put_raw(&mut self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.storage.cf_handle(cf_name)?;
        self.batch.put_cf(cf, key, value);
        Ok(())
    }

    /// Stage a raw delete from a document column family
    pub fn delete_raw(&mut self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.storage.cf_handle(cf_name)?;
        self.batch.delete_cf(cf, key);
        Ok(())
    }

    /// Read committed document state (this unit holds the commit lock, so
    /// the view cannot change underneath it)
    pub fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.storage.get_raw(cf_name, key)
    }

    /// Commit all staged writes atomically and release the commit lock
    pub fn commit(self) -> Result<()> {
        self.storage.db.write(self.batch)?;
        Ok(())
    }
}

//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Current balance snapshot per user (key: user_id)
//! - `transactions` - Append-only audit log (key: transaction_id, UUIDv7)
//! - `indices` - Secondary indices (user -> transaction; shared raw index
//!   space for callers that compose documents into ledger transactions)
//!
//! Callers may register additional document column families at open time;
//! the ledger only writes `wallets`/`transactions`/`indices` itself, but a
//! single database keeps cross-entity [`crate::LedgerTxn`] commits atomic.

use crate::{
    error::{Error, Result},
    types::{Currency, Wallet, WalletTransaction},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use std::sync::atomic::AtomicU64;
use uuid::Uuid;

/// Column family names
pub const CF_WALLETS: &str = "wallets";
/// Transaction log column family
pub const CF_TRANSACTIONS: &str = "transactions";
/// Secondary index column family
pub const CF_INDICES: &str = "indices";

/// Storage wrapper for RocksDB
pub struct Storage {
    pub(crate) db: DB,

    /// Serializes write transactions (commit lock); combined with the
    /// all-or-nothing WriteBatch commit this closes the race window
    /// between two concurrent operations on the same wallet.
    pub(crate) write_lock: Mutex<()>,

    /// Currency for lazily created wallets
    pub(crate) default_currency: Currency,

    /// Tie-breaker for history index keys written in the same nanosecond
    pub(crate) row_seq: AtomicU64,
}

impl Storage {
    /// Open or create the database, registering the core column families
    /// plus any caller-supplied document column families.
    pub fn open(config: &Config, extra_cfs: &[&str]) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let mut cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_snapshot()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_snapshot()),
        ];
        for name in extra_cfs {
            cf_descriptors.push(ColumnFamilyDescriptor::new(
                *name,
                Self::cf_options_snapshot(),
            ));
        }

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, extra_cfs = extra_cfs.len(), "Opened wallet ledger storage");

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
            default_currency: config.default_currency,
            row_seq: AtomicU64::new(0),
        })
    }

    // Column family options

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        // Append-only rows compress well
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_snapshot() -> Options {
        let mut opts = Options::default();
        // Frequently read, favor speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    /// Get column family handle
    pub(crate) fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Wallet reads

    /// Get wallet snapshot by user ID
    pub fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;
        match self.db.get_cf(cf, user_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Transaction log reads

    /// Get a transaction row by ID
    pub fn get_transaction(&self, transaction_id: Uuid) -> Result<WalletTransaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = self
            .db
            .get_cf(cf, transaction_id.as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Paginated transaction history for a user, oldest first
    ///
    /// Index keys are user || timestamp_nanos || sequence, so the scan order
    /// is the insertion order; the row ID lives in the value.
    pub fn wallet_transactions(
        &self,
        user_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = user_id.as_bytes();

        let iter = self.db.iterator_cf(
            cf_indices,
            IteratorMode::From(prefix, Direction::Forward),
        );

        let mut rows = Vec::new();
        let mut seen = 0usize;
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            seen += 1;
            if seen <= offset {
                continue;
            }
            if rows.len() >= limit {
                break;
            }
            let txn_bytes: [u8; 16] = value
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed index value".to_string()))?;
            rows.push(self.get_transaction(Uuid::from_bytes(txn_bytes))?);
        }

        Ok(rows)
    }

    // Raw document access (for callers composing into ledger transactions)

    /// Get a raw value from a document column family
    pub fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    /// Scan a document column family by key prefix
    pub fn scan_raw(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf_handle(cf_name)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    // Index key helpers

    pub(crate) fn index_key_user_txn(user_id: &Uuid, timestamp_nanos: i64, seq: u64) -> Vec<u8> {
        let mut key = user_id.as_bytes().to_vec();
        key.extend_from_slice(&(timestamp_nanos.max(0) as u64).to_be_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }
}

//! RocksDB-backed persistent stake ledger.
//!
//! Implements [`LedgerStore`] using two column families: `records`
//! (account id → bincode [`StakeRecord`]) and `metadata` (running
//! aggregates). Each upsert writes the record and the updated aggregates in
//! one [`WriteBatch`], so `total_staked` is never visible out of step with
//! the records.

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use tracing::debug;

use stakelock_core::error::LedgerError;
use stakelock_core::ledger::{adjusted_total, LedgerStore};
use stakelock_core::types::{AccountId, Amount, StakeRecord};

// --- Column family names ---

const CF_RECORDS: &str = "records";
const CF_METADATA: &str = "metadata";

const ALL_CFS: &[&str] = &[CF_RECORDS, CF_METADATA];

// --- Metadata keys ---

const META_TOTAL_STAKED: &[u8] = b"total_staked";
const META_ACCOUNT_COUNT: &[u8] = b"account_count";

fn storage_err(e: impl ToString) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

/// Persistent stake ledger.
pub struct RocksLedger {
    db: DB,
}

impl RocksLedger {
    /// Open or create a ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(storage_err)?;

        Ok(Self { db })
    }

    /// Flush all in-memory buffers to disk.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush().map_err(storage_err)
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, LedgerError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("missing column family: {name}")))
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db.get_cf(cf, key).map_err(storage_err)
    }

    fn meta_total(&self) -> Result<Amount, LedgerError> {
        match self.get_meta(META_TOTAL_STAKED)? {
            Some(bytes) => {
                let raw: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| LedgerError::Storage("invalid total_staked length".into()))?;
                Ok(Amount::from_le_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn meta_count(&self) -> Result<u64, LedgerError> {
        match self.get_meta(META_ACCOUNT_COUNT)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| LedgerError::Storage("invalid account_count length".into()))?;
                Ok(u64::from_le_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn decode_record(account: &AccountId, bytes: &[u8]) -> Result<StakeRecord, LedgerError> {
        let (record, _): (StakeRecord, _) =
            bincode::decode_from_slice(bytes, bincode::config::standard()).map_err(|e| {
                LedgerError::Corrupt {
                    account: account.to_string(),
                    reason: e.to_string(),
                }
            })?;
        Ok(record)
    }
}

impl LedgerStore for RocksLedger {
    fn get(&self, account: &AccountId) -> Result<StakeRecord, LedgerError> {
        let cf = self.cf_handle(CF_RECORDS)?;
        match self.db.get_cf(cf, account.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Self::decode_record(account, &bytes),
            None => Ok(StakeRecord::ZERO),
        }
    }

    fn upsert(&mut self, account: &AccountId, record: StakeRecord) -> Result<(), LedgerError> {
        let old = self.get(account)?;
        let total = adjusted_total(self.meta_total()?, old.principal, record.principal)?;

        let count = match (old.is_zero(), record.is_zero()) {
            (true, false) => self.meta_count()?.saturating_add(1),
            (false, true) => self.meta_count()?.saturating_sub(1),
            _ => self.meta_count()?,
        };

        let cf_records = self.cf_handle(CF_RECORDS)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;
        let mut batch = WriteBatch::default();

        if record.is_zero() {
            batch.delete_cf(cf_records, account.as_bytes());
        } else {
            let bytes = bincode::encode_to_vec(record, bincode::config::standard())
                .map_err(storage_err)?;
            batch.put_cf(cf_records, account.as_bytes(), bytes);
        }
        batch.put_cf(cf_meta, META_TOTAL_STAKED, total.to_le_bytes());
        batch.put_cf(cf_meta, META_ACCOUNT_COUNT, count.to_le_bytes());

        self.db.write(batch).map_err(storage_err)?;
        debug!(%account, principal = %record.principal, total = %total, "ledger record written");
        Ok(())
    }

    fn total_staked(&self) -> Result<Amount, LedgerError> {
        self.meta_total()
    }

    fn account_count(&self) -> Result<usize, LedgerError> {
        Ok(self.meta_count()? as usize)
    }
}

//! Stake ledger interface and in-memory implementation.
//!
//! Provides the [`LedgerStore`] trait for per-account stake records and the
//! platform aggregate. The [`MemoryLedger`] is suitable for testing and
//! scenario replay; the persistent ledger uses RocksDB (stakelock-platform).
//!
//! Missing accounts read as [`StakeRecord::ZERO`]. Writing the zero record
//! deletes the entry. `total_staked` is maintained incrementally on every
//! upsert and never derived by iteration.

use std::collections::HashMap;

use crate::error::LedgerError;
use crate::types::{AccountId, Amount, StakeRecord};

/// Mutable stake ledger interface.
///
/// Not synchronized internally. The settlement coordinator holds it behind a lock and
/// is the only writer.
pub trait LedgerStore: Send + Sync {
    /// Record for `account`, or the zero record if none is stored.
    fn get(&self, account: &AccountId) -> Result<StakeRecord, LedgerError>;

    /// Replace the record for `account`, adjusting `total_staked` by the
    /// principal delta. Writing [`StakeRecord::ZERO`] removes the entry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AggregateOverflow`] / [`LedgerError::AggregateUnderflow`]
    ///   if the principal delta would take the aggregate out of range
    /// - [`LedgerError::Storage`] on backend failure
    fn upsert(&mut self, account: &AccountId, record: StakeRecord) -> Result<(), LedgerError>;

    /// Sum of all stored principal.
    fn total_staked(&self) -> Result<Amount, LedgerError>;

    /// Number of accounts with a stored (non-zero) record.
    fn account_count(&self) -> Result<usize, LedgerError>;
}

/// Aggregate after replacing a record with principal `old` by one with principal `new`.
pub fn adjusted_total(total: Amount, old: Amount, new: Amount) -> Result<Amount, LedgerError> {
    let without = total
        .checked_sub(old)
        .ok_or(LedgerError::AggregateUnderflow { total, removing: old })?;
    without.checked_add(new).ok_or(LedgerError::AggregateOverflow)
}

/// In-memory stake ledger.
///
/// Stores records in a `HashMap` with no persistence.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    /// Non-zero records by account.
    records: HashMap<AccountId, StakeRecord>,
    /// Running sum of `records[*].principal`.
    total_staked: Amount,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedger {
    fn get(&self, account: &AccountId) -> Result<StakeRecord, LedgerError> {
        Ok(self.records.get(account).copied().unwrap_or_default())
    }

    fn upsert(&mut self, account: &AccountId, record: StakeRecord) -> Result<(), LedgerError> {
        let old = self.get(account)?;
        let total = adjusted_total(self.total_staked, old.principal, record.principal)?;
        if record.is_zero() {
            self.records.remove(account);
        } else {
            self.records.insert(*account, record);
        }
        self.total_staked = total;
        Ok(())
    }

    fn total_staked(&self) -> Result<Amount, LedgerError> {
        Ok(self.total_staked)
    }

    fn account_count(&self) -> Result<usize, LedgerError> {
        Ok(self.records.len())
    }
}

//! Lock gate: withdrawal opens `lock_duration` seconds after the lock anchor.

use crate::types::{AccountState, StakeRecord, Timestamp};

/// Pure predicate over a record's lock anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockGate {
    lock_duration_secs: u64,
}

impl LockGate {
    pub fn new(lock_duration_secs: u64) -> Self {
        Self { lock_duration_secs }
    }

    pub fn lock_duration_secs(&self) -> u64 {
        self.lock_duration_secs
    }

    /// Time at which the record becomes withdrawable. `None` without an anchor.
    pub fn unlock_time(&self, record: &StakeRecord) -> Option<Timestamp> {
        record
            .lock_anchor
            .map(|anchor| anchor.saturating_add(self.lock_duration_secs))
    }

    /// Seconds since the lock anchor, or 0 without an anchor.
    ///
    /// Saturates at 0 for `now` before the anchor; clock regression is
    /// detected upstream.
    pub fn elapsed(&self, record: &StakeRecord, now: Timestamp) -> u64 {
        record
            .lock_anchor
            .map_or(0, |anchor| now.saturating_sub(anchor))
    }

    /// Whether the record has an anchor and at least `lock_duration` has passed.
    ///
    /// Callers must check for principal first: an anchorless record is never
    /// unlocked, but that case is reported as "nothing staked".
    pub fn is_unlocked(&self, record: &StakeRecord, now: Timestamp) -> bool {
        record.lock_anchor.is_some() && self.elapsed(record, now) >= self.lock_duration_secs
    }

    /// Derived lifecycle state.
    pub fn state(&self, record: &StakeRecord, now: Timestamp) -> AccountState {
        if !record.has_principal() {
            return AccountState::Empty;
        }
        if self.is_unlocked(record, now) {
            return AccountState::Unlockable;
        }
        match self.unlock_time(record) {
            Some(unlocks_at) => AccountState::Locked { unlocks_at },
            // Principal without an anchor cannot be produced by the coordinator.
            None => AccountState::Locked { unlocks_at: Timestamp::MAX },
        }
    }
}

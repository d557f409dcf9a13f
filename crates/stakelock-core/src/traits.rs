//! Trait interfaces for the Stakelock engine.
//!
//! These traits define the contracts between crates:
//! - [`AccrualCalculator`] — reward math (stakelock-accrual implements)
//! - [`Custody`] — asset movement in and out of engine custody (stakelock-platform implements)
//! - [`Clock`] — ambient time source (stakelock-platform implements)
//!
//! The stake ledger contract lives in [`ledger`](crate::ledger).

use crate::error::{AccrualError, CustodyError};
use crate::types::{AccountId, Amount, StakeRecord, Timestamp};

/// Pure computation of accrued reward.
///
/// All reward math uses integer arithmetic with fixed-point precision.
/// Implementations must truncate toward zero and never accrue for an
/// interval that ends before the record's accrual cursor.
pub trait AccrualCalculator: Send + Sync {
    /// Reward earned by `principal` held for `elapsed_secs`.
    fn earned(&self, principal: Amount, elapsed_secs: u64) -> Result<Amount, AccrualError>;

    /// Fold reward pending since `record.accrual_cursor` into `settled_reward`
    /// and advance the cursor to `now`.
    ///
    /// Settling twice at the same `now` is a no-op the second time.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::ClockRegression`] if `now < record.accrual_cursor`
    /// - [`AccrualError::ArithmeticOverflow`] if the reward does not fit an [`Amount`]
    fn settle(&self, record: &StakeRecord, now: Timestamp) -> Result<StakeRecord, AccrualError> {
        let elapsed = now
            .checked_sub(record.accrual_cursor)
            .ok_or(AccrualError::ClockRegression {
                cursor: record.accrual_cursor,
                now,
            })?;
        let earned = self.earned(record.principal, elapsed)?;
        let settled_reward = record
            .settled_reward
            .checked_add(earned)
            .ok_or(AccrualError::ArithmeticOverflow)?;
        Ok(StakeRecord {
            settled_reward,
            accrual_cursor: now,
            ..*record
        })
    }

    /// Settled plus pending reward at `now`, without mutating anything.
    ///
    /// Default implementation: `settle(record, now).settled_reward`, so the
    /// preview and commit paths share one formula.
    fn preview_reward(&self, record: &StakeRecord, now: Timestamp) -> Result<Amount, AccrualError> {
        Ok(self.settle(record, now)?.settled_reward)
    }
}

/// Asset movement between accounts and engine custody.
///
/// The engine calls these only after its own validation passes. Any error
/// aborts the enclosing operation with the ledger restored.
pub trait Custody: Send + Sync {
    /// Move `amount` of the stake asset from `account` into custody.
    fn pull_in(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError>;

    /// Move `amount` of the stake asset from custody back to `account`.
    fn push_out(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError>;

    /// Pay `amount` of the reward asset to `account` from the pre-funded reserve.
    fn pay_reward(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError>;

    /// Compensate a [`pay_reward`](Self::pay_reward) whose withdrawal failed on the principal leg.
    fn reverse_reward(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError>;

    /// Reward asset still available in the reserve.
    fn reward_reserve(&self) -> Amount;
}

/// Ambient time source. Must be monotonically non-decreasing.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn now(&self) -> Timestamp;
}

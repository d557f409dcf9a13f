//! Error types for the Stakelock engine.
use thiserror::Error;

use crate::types::{Amount, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("clock regression: now {now} is before accrual cursor {cursor}")] ClockRegression { cursor: Timestamp, now: Timestamp },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("insufficient reward reserve: have {have}, need {need}")] InsufficientReserve { have: Amount, need: Amount },
    #[error("insufficient custody holdings: have {have}, need {need}")] InsufficientHoldings { have: Amount, need: Amount },
    #[error("transfer declined: {0}")] Declined(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("storage: {0}")] Storage(String),
    #[error("corrupt record for {account}: {reason}")] Corrupt { account: String, reason: String },
    #[error("aggregate overflow")] AggregateOverflow,
    #[error("aggregate underflow: total {total}, removing {removing}")] AggregateUnderflow { total: Amount, removing: Amount },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid account id: {0}")] InvalidAccount(String),
    #[error("per-account cap must be positive")] ZeroAccountCap,
    #[error("platform cap {platform_cap} is below per-account cap {per_account_cap}")] PlatformCapBelowAccountCap { platform_cap: Amount, per_account_cap: Amount },
    #[error("platform cap is only enforced in native-asset mode")] PlatformCapInTokenMode,
    #[error("lock duration must be positive")] ZeroLockDuration,
    #[error("stake and reward asset must both be named")] UnnamedAsset,
    #[error("amount overflow: {0}")] AmountOverflow(String),
}

/// Errors surfaced by the settlement coordinator.
///
/// Every variant leaves the ledger unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    #[error("deposit amount must be positive")] InvalidAmount,
    #[error("max staking amount per account is reached: {current} + {amount} > {cap}")] AccountCapExceeded { current: Amount, amount: Amount, cap: Amount },
    #[error("max staking amount per platform is reached: {total} + {amount} > {cap}")] PlatformCapExceeded { total: Amount, amount: Amount, cap: Amount },
    #[error("nothing staked")] NothingStaked,
    #[error("lock period not expired: {elapsed}s elapsed of {required}s required")] LockNotExpired { elapsed: u64, required: u64 },
    #[error("custody transfer failed: {0}")] CustodyTransferFailed(#[from] CustodyError),
    #[error("clock regression: observed {now} after {last}")] ClockRegression { last: Timestamp, now: Timestamp },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Ledger(#[from] LedgerError),
}

impl StakeError {
    /// Environment contract violations that must abort processing rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ClockRegression { .. } | Self::ArithmeticOverflow)
    }
}

impl From<AccrualError> for StakeError {
    fn from(e: AccrualError) -> Self {
        match e {
            AccrualError::ClockRegression { cursor, now } => Self::ClockRegression { last: cursor, now },
            AccrualError::ArithmeticOverflow => Self::ArithmeticOverflow,
        }
    }
}

//! Engine constants. All amounts in base units (1 token = 10^18 base units).

use crate::types::{Amount, Timestamp};

/// Base units per whole token.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Seconds in one accrual day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Fixed-point denominator for `daily_rate_ppb`. `RATE_PRECISION` is a rate of 1.0 per day.
pub const RATE_PRECISION: u64 = 1_000_000_000;

/// Default reward rate: 100% of principal per day.
pub const DEFAULT_DAILY_RATE_PPB: u64 = RATE_PRECISION;

/// Default lock period: 90 days from the first deposit of a staking lifecycle.
pub const DEFAULT_LOCK_DURATION_SECS: Timestamp = 90 * SECONDS_PER_DAY;

/// Default ceiling on a single account's principal (50 tokens).
pub const DEFAULT_PER_ACCOUNT_CAP: Amount = 50 * UNIT;

/// Default ceiling on aggregate principal in native-asset mode (10,000 tokens).
pub const DEFAULT_PLATFORM_CAP: Amount = 10_000 * UNIT;

/// Symbol used for the stake asset when none is configured.
pub const DEFAULT_STAKE_ASSET: &str = "WETH";

/// Symbol used for the reward asset when none is configured.
pub const DEFAULT_REWARD_ASSET: &str = "RT";

//! Accrual engine implementing the [`AccrualCalculator`] trait.
//!
//! Linear reward over elapsed seconds at a fixed daily rate. All arithmetic
//! is integer-only with u128 intermediates and a single truncating division.

use stakelock_core::config::EngineConfig;
use stakelock_core::constants::{RATE_PRECISION, SECONDS_PER_DAY};
use stakelock_core::error::AccrualError;
use stakelock_core::traits::AccrualCalculator;
use stakelock_core::types::Amount;

use crate::fixed::mul_div;

/// Denominator of the per-second reward: one day expressed in rate units.
const DAY_RATE_DENOM: u128 = SECONDS_PER_DAY as u128 * RATE_PRECISION as u128;

/// The production accrual calculator.
///
/// Implements [`AccrualCalculator`] with:
/// - Linear accrual proportional to principal and elapsed seconds
/// - Exact multiply-before-divide with truncation toward zero
/// - Settlement and preview inherited from the trait so both share one formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualEngine {
    daily_rate_ppb: u64,
}

impl AccrualEngine {
    /// Create an engine accruing `daily_rate_ppb / RATE_PRECISION` of principal per day.
    pub fn new(daily_rate_ppb: u64) -> Self {
        Self { daily_rate_ppb }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.daily_rate_ppb)
    }

    pub fn daily_rate_ppb(&self) -> u64 {
        self.daily_rate_ppb
    }
}

impl AccrualCalculator for AccrualEngine {
    fn earned(&self, principal: Amount, elapsed_secs: u64) -> Result<Amount, AccrualError> {
        if principal == 0 || elapsed_secs == 0 || self.daily_rate_ppb == 0 {
            return Ok(0);
        }

        // principal * rate is checked here; the elapsed factor may exceed 128
        // bits and is handled exactly by mul_div.
        let scaled = principal
            .checked_mul(self.daily_rate_ppb as u128)
            .ok_or(AccrualError::ArithmeticOverflow)?;

        mul_div(scaled, elapsed_secs as u128, DAY_RATE_DENOM)
    }
}

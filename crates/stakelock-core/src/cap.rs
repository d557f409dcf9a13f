//! Deposit ceilings.
//!
//! Both checks run against post-deposit totals and are inclusive: landing
//! exactly on a cap is accepted, one base unit over is rejected.

use crate::config::EngineConfig;
use crate::error::StakeError;
use crate::types::Amount;

/// Per-account and optional platform-wide principal ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapPolicy {
    per_account_cap: Amount,
    platform_cap: Option<Amount>,
}

impl CapPolicy {
    /// Create a policy. `platform_cap = None` disables the aggregate check.
    pub fn new(per_account_cap: Amount, platform_cap: Option<Amount>) -> Self {
        Self {
            per_account_cap,
            platform_cap,
        }
    }

    /// Policy for a validated engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.per_account_cap, config.enforced_platform_cap())
    }

    pub fn per_account_cap(&self) -> Amount {
        self.per_account_cap
    }

    pub fn platform_cap(&self) -> Option<Amount> {
        self.platform_cap
    }

    /// Validate a deposit of `amount` onto `account_before` with `platform_before` staked overall.
    ///
    /// A sum that overflows [`Amount`] is treated as exceeding the cap.
    pub fn check_deposit(
        &self,
        account_before: Amount,
        amount: Amount,
        platform_before: Amount,
    ) -> Result<(), StakeError> {
        let exceeds = |before: Amount, cap: Amount| before.checked_add(amount).is_none_or(|after| after > cap);

        if exceeds(account_before, self.per_account_cap) {
            return Err(StakeError::AccountCapExceeded {
                current: account_before,
                amount,
                cap: self.per_account_cap,
            });
        }

        if let Some(cap) = self.platform_cap {
            if exceeds(platform_before, cap) {
                return Err(StakeError::PlatformCapExceeded {
                    total: platform_before,
                    amount,
                    cap,
                });
            }
        }

        Ok(())
    }
}

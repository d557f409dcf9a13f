//! Engine configuration, fixed at construction.
//!
//! [`EngineConfig::validate`] must pass before a platform is built; the
//! coordinator never mutates the configuration afterwards.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DAILY_RATE_PPB, DEFAULT_LOCK_DURATION_SECS, DEFAULT_PER_ACCOUNT_CAP,
    DEFAULT_PLATFORM_CAP, DEFAULT_REWARD_ASSET, DEFAULT_STAKE_ASSET, UNIT,
};
use crate::error::ConfigError;
use crate::types::Amount;

/// How the stake asset enters custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetMode {
    /// Native coin, wrapped on deposit and unwrapped on withdrawal.
    /// The platform cap is enforced.
    #[default]
    Native,
    /// Ordinary fungible token moved under an allowance. No platform cap.
    Token,
}

impl AssetMode {
    /// Whether the platform-wide cap applies in this mode.
    pub fn enforces_platform_cap(&self) -> bool {
        matches!(self, Self::Native)
    }
}

/// Immutable engine configuration. Amounts in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbol of the staked asset.
    pub stake_asset: String,
    /// Symbol of the reward asset.
    pub reward_asset: String,
    pub asset_mode: AssetMode,
    pub per_account_cap: Amount,
    /// Aggregate ceiling; must be `None` in [`AssetMode::Token`].
    pub platform_cap: Option<Amount>,
    /// Reward per day as parts-per-billion of principal.
    pub daily_rate_ppb: u64,
    pub lock_duration_secs: u64,
    /// Reward asset pre-funded into the reserve at construction.
    pub initial_reward_reserve: Amount,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stake_asset: DEFAULT_STAKE_ASSET.to_string(),
            reward_asset: DEFAULT_REWARD_ASSET.to_string(),
            asset_mode: AssetMode::Native,
            per_account_cap: DEFAULT_PER_ACCOUNT_CAP,
            platform_cap: Some(DEFAULT_PLATFORM_CAP),
            daily_rate_ppb: DEFAULT_DAILY_RATE_PPB,
            lock_duration_secs: DEFAULT_LOCK_DURATION_SECS,
            initial_reward_reserve: 1_000_000 * UNIT,
        }
    }
}

impl EngineConfig {
    /// Token-mode defaults: same caps and rate, no platform cap.
    pub fn token_mode() -> Self {
        Self {
            stake_asset: "STK".to_string(),
            asset_mode: AssetMode::Token,
            platform_cap: None,
            ..Self::default()
        }
    }

    /// Platform cap that is actually enforced for the configured mode.
    pub fn enforced_platform_cap(&self) -> Option<Amount> {
        self.platform_cap
            .filter(|_| self.asset_mode.enforces_platform_cap())
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroAccountCap`] / [`ConfigError::ZeroLockDuration`]
    /// - [`ConfigError::PlatformCapInTokenMode`] if a platform cap is set in token mode
    /// - [`ConfigError::PlatformCapBelowAccountCap`] if no single account could reach its cap
    /// - [`ConfigError::UnnamedAsset`] if either asset symbol is blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stake_asset.trim().is_empty() || self.reward_asset.trim().is_empty() {
            return Err(ConfigError::UnnamedAsset);
        }
        if self.per_account_cap == 0 {
            return Err(ConfigError::ZeroAccountCap);
        }
        if self.lock_duration_secs == 0 {
            return Err(ConfigError::ZeroLockDuration);
        }
        match (self.asset_mode, self.platform_cap) {
            (AssetMode::Token, Some(_)) => return Err(ConfigError::PlatformCapInTokenMode),
            (AssetMode::Native, Some(platform_cap)) if platform_cap < self.per_account_cap => {
                return Err(ConfigError::PlatformCapBelowAccountCap {
                    platform_cap,
                    per_account_cap: self.per_account_cap,
                });
            }
            _ => {}
        }
        Ok(())
    }
}

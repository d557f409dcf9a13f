//! Layered settings: built-in defaults, an optional TOML file, then
//! `STAKELOCK_*` environment variables (nested keys separated by `__`,
//! e.g. `STAKELOCK_ENGINE__PER_ACCOUNT_CAP_UNITS=25`).
//!
//! Amounts are whole tokens here and converted to base units by
//! [`EngineSettings::to_engine_config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stakelock_core::config::{AssetMode, EngineConfig};
use stakelock_core::constants::{
    DEFAULT_DAILY_RATE_PPB, DEFAULT_LOCK_DURATION_SECS, DEFAULT_PER_ACCOUNT_CAP,
    DEFAULT_PLATFORM_CAP, DEFAULT_REWARD_ASSET, DEFAULT_STAKE_ASSET, SECONDS_PER_DAY, UNIT,
};
use stakelock_core::error::ConfigError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "STAKELOCK";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("loading settings: {0}")] Load(#[from] config::ConfigError),
    #[error("invalid engine settings: {0}")] Invalid(#[from] ConfigError),
}

/// Engine parameters as written by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub stake_asset: String,
    pub reward_asset: String,
    pub asset_mode: AssetMode,
    pub per_account_cap_units: u64,
    /// Ignored unless `asset_mode` is native.
    pub platform_cap_units: Option<u64>,
    pub daily_rate_ppb: u64,
    pub lock_days: u64,
    pub reward_reserve_units: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            stake_asset: DEFAULT_STAKE_ASSET.to_string(),
            reward_asset: DEFAULT_REWARD_ASSET.to_string(),
            asset_mode: AssetMode::Native,
            per_account_cap_units: (DEFAULT_PER_ACCOUNT_CAP / UNIT) as u64,
            platform_cap_units: Some((DEFAULT_PLATFORM_CAP / UNIT) as u64),
            daily_rate_ppb: DEFAULT_DAILY_RATE_PPB,
            lock_days: DEFAULT_LOCK_DURATION_SECS / SECONDS_PER_DAY,
            reward_reserve_units: 1_000_000,
        }
    }
}

impl EngineSettings {
    /// Convert to a validated [`EngineConfig`] in base units.
    ///
    /// A platform cap given in token mode is dropped rather than rejected so
    /// one file can drive both modes.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let lock_duration_secs = self
            .lock_days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or_else(|| ConfigError::AmountOverflow(format!("lock_days = {}", self.lock_days)))?;

        let platform_cap = match self.asset_mode {
            AssetMode::Native => self.platform_cap_units.map(|u| u as u128 * UNIT),
            AssetMode::Token => None,
        };

        let config = EngineConfig {
            stake_asset: self.stake_asset.clone(),
            reward_asset: self.reward_asset.clone(),
            asset_mode: self.asset_mode,
            per_account_cap: self.per_account_cap_units as u128 * UNIT,
            platform_cap,
            daily_rate_ppb: self.daily_rate_ppb,
            lock_duration_secs,
            initial_reward_reserve: self.reward_reserve_units as u128 * UNIT,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory for the persistent ledger.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "debug", "stakelock_platform=trace").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    pub engine: EngineSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stakelock");

        Self {
            data_dir,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            engine: EngineSettings::default(),
        }
    }
}

impl Settings {
    /// Load defaults, then `file` if given, then environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with_env(file, None)
    }

    /// As [`Settings::load`], reading overrides from `env` instead of the
    /// process environment when given.
    fn load_with_env(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    /// Path to the RocksDB ledger directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.engine.to_engine_config()
    }
}

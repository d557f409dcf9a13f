//! Shared fixtures for scenario and adversarial tests.

use std::sync::Arc;

use stakelock_core::config::EngineConfig;
use stakelock_core::constants::UNIT;
use stakelock_core::ledger::LedgerStore;
use stakelock_core::types::{AccountId, Amount};
use stakelock_platform::{ManualClock, MemoryCustody, MemoryPlatform, StakingPlatform};

/// Scenario epoch. Any non-zero start works; zero would hide anchor bugs.
pub const T0: u64 = 1_700_000_000;

/// Wallet balance given to every funded account.
pub const WALLET: Amount = 1_000 * UNIT;

/// Deterministic account id from a seed byte.
pub fn acct(seed: u8) -> AccountId {
    AccountId([seed; 20])
}

/// Whole tokens to base units.
pub fn units(n: u64) -> Amount {
    n as Amount * UNIT
}

/// Give each account [`WALLET`] of stake asset and a matching allowance.
pub fn fund<L: LedgerStore>(platform: &StakingPlatform<L, MemoryCustody>, accounts: &[AccountId]) {
    platform.with_custody_mut(|custody| {
        for account in accounts {
            custody.fund(account, WALLET).expect("fund wallet");
            custody.approve(account, WALLET);
        }
    });
}

/// In-memory platform at [`T0`] with `accounts` funded.
pub fn platform_with(config: EngineConfig, accounts: &[AccountId]) -> (MemoryPlatform, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let platform = MemoryPlatform::in_memory(config, clock.clone()).expect("valid config");
    fund(&platform, accounts);
    (platform, clock)
}

/// Default-configured platform with accounts 1 through 4 funded.
pub fn platform() -> (MemoryPlatform, Arc<ManualClock>) {
    platform_with(EngineConfig::default(), &[acct(1), acct(2), acct(3), acct(4)])
}

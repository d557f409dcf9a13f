//! Settlement coordinator.
//!
//! The [`StakingPlatform`] wires the cap policy, lock gate, accrual
//! calculator, ledger, and custody into the deposit/withdraw state machine.
//! Every mutation runs under a single write lock and either completes or
//! leaves the ledger exactly as it was.
//!
//! Account states are derived, never stored:
//! Empty → (deposit) → Locked → (time) → Unlockable → (withdraw) → Empty.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use stakelock_accrual::AccrualEngine;
use stakelock_core::cap::CapPolicy;
use stakelock_core::config::EngineConfig;
use stakelock_core::error::{ConfigError, CustodyError, StakeError};
use stakelock_core::ledger::{LedgerStore, MemoryLedger};
use stakelock_core::lock::LockGate;
use stakelock_core::traits::{AccrualCalculator, Clock, Custody};
use stakelock_core::types::{
    AccountId, AccountState, Amount, DepositReceipt, StakeRecord, Timestamp, WithdrawalReceipt,
};

use crate::custody::MemoryCustody;

/// Platform over the in-memory ledger and custody.
pub type MemoryPlatform = StakingPlatform<MemoryLedger, MemoryCustody>;

/// Mutable state guarded by the platform lock.
struct PlatformState<L, K> {
    ledger: L,
    custody: K,
}

/// A withdrawal leg that custody declined.
struct ReleaseFailure {
    error: CustodyError,
    /// The reward leg was paid and could not be reversed.
    reward_kept: bool,
}

/// The settlement coordinator.
pub struct StakingPlatform<L: LedgerStore, K: Custody> {
    config: EngineConfig,
    caps: CapPolicy,
    gate: LockGate,
    accrual: Arc<dyn AccrualCalculator>,
    clock: Arc<dyn Clock>,
    /// Highest `now` any operation has observed.
    high_water: AtomicU64,
    state: RwLock<PlatformState<L, K>>,
}

impl MemoryPlatform {
    /// Platform with an empty in-memory ledger and custody funded per `config`.
    pub fn in_memory(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let custody = MemoryCustody::from_config(&config);
        Self::new(config, MemoryLedger::new(), custody, clock)
    }
}

impl<L: LedgerStore, K: Custody> StakingPlatform<L, K> {
    /// Validate `config` and assemble a platform over the given collaborators.
    pub fn new(
        config: EngineConfig,
        ledger: L,
        custody: K,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            stake_asset = %config.stake_asset,
            reward_asset = %config.reward_asset,
            mode = ?config.asset_mode,
            lock_secs = config.lock_duration_secs,
            rate_ppb = config.daily_rate_ppb,
            "staking platform configured"
        );
        Ok(Self {
            caps: CapPolicy::from_config(&config),
            gate: LockGate::new(config.lock_duration_secs),
            accrual: Arc::new(AccrualEngine::from_config(&config)),
            clock,
            high_water: AtomicU64::new(0),
            state: RwLock::new(PlatformState { ledger, custody }),
            config,
        })
    }

    /// Replace the accrual calculator.
    pub fn with_accrual(mut self, accrual: Arc<dyn AccrualCalculator>) -> Self {
        self.accrual = accrual;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read the current time, rejecting any value below one already observed.
    fn observe_now(&self) -> Result<Timestamp, StakeError> {
        let now = self.clock.now();
        let last = self.high_water.fetch_max(now, Ordering::SeqCst);
        if now < last {
            error!(now, last, "clock moved backwards; aborting operation");
            return Err(StakeError::ClockRegression { last, now });
        }
        Ok(now)
    }

    /// Reject a `now` behind the record's accrual cursor. The high-water mark
    /// starts fresh with each platform, so a reopened ledger relies on this.
    fn check_cursor(record: &StakeRecord, now: Timestamp) -> Result<(), StakeError> {
        if now < record.accrual_cursor {
            error!(now, cursor = record.accrual_cursor, "clock behind accrual cursor; aborting operation");
            return Err(StakeError::ClockRegression { last: record.accrual_cursor, now });
        }
        Ok(())
    }

    fn log_rejection(op: &str, account: &AccountId, e: &StakeError) {
        if e.is_fatal() {
            error!(op, %account, "operation aborted: {e}");
        } else {
            debug!(op, %account, "operation rejected: {e}");
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Stake `amount` for `account`.
    ///
    /// Valid from Empty or Locked (and Unlockable). Re-staking folds pending
    /// reward and adds principal without moving the lock anchor.
    ///
    /// # Errors
    ///
    /// - [`StakeError::InvalidAmount`] for a zero amount
    /// - [`StakeError::AccountCapExceeded`] / [`StakeError::PlatformCapExceeded`]
    /// - [`StakeError::CustodyTransferFailed`] if custody declines the inbound transfer
    /// - [`StakeError::ClockRegression`] if time moved backwards
    pub fn deposit(&self, account: &AccountId, amount: Amount) -> Result<DepositReceipt, StakeError> {
        let mut guard = self.state.write();
        self.deposit_locked(&mut guard, account, amount)
            .inspect_err(|e| Self::log_rejection("deposit", account, e))
    }

    fn deposit_locked(
        &self,
        state: &mut PlatformState<L, K>,
        account: &AccountId,
        amount: Amount,
    ) -> Result<DepositReceipt, StakeError> {
        let now = self.observe_now()?;
        let record = state.ledger.get(account)?;
        Self::check_cursor(&record, now)?;
        if amount == 0 {
            return Err(StakeError::InvalidAmount);
        }

        let total = state.ledger.total_staked()?;
        self.caps.check_deposit(record.principal, amount, total)?;

        let settled = self.accrual.settle(&record, now)?;
        let principal = settled
            .principal
            .checked_add(amount)
            .ok_or(StakeError::ArithmeticOverflow)?;
        let anchor = match settled.lock_anchor {
            Some(anchor) if record.has_principal() => anchor,
            _ => now,
        };
        let updated = StakeRecord {
            principal,
            lock_anchor: Some(anchor),
            ..settled
        };

        state.ledger.upsert(account, updated)?;
        if let Err(e) = state.custody.pull_in(account, amount) {
            warn!(%account, amount = %amount, "inbound transfer declined: {e}");
            Self::restore(&mut state.ledger, account, record)?;
            return Err(e.into());
        }

        let unlocks_at = anchor.saturating_add(self.gate.lock_duration_secs());
        info!(
            %account,
            amount = %amount,
            principal = %updated.principal,
            settled_reward = %updated.settled_reward,
            unlocks_at,
            "deposit accepted"
        );
        Ok(DepositReceipt {
            amount,
            principal: updated.principal,
            settled_reward: updated.settled_reward,
            unlocks_at,
        })
    }

    /// Release principal and accrued reward for an Unlockable account.
    ///
    /// # Errors
    ///
    /// - [`StakeError::NothingStaked`] if the account holds no principal
    /// - [`StakeError::LockNotExpired`] before the lock period has elapsed
    /// - [`StakeError::CustodyTransferFailed`] if either outbound leg fails;
    ///   the account's record is restored unchanged, except that a reward
    ///   custody could not take back is no longer owed
    /// - [`StakeError::ClockRegression`] if time moved backwards, including
    ///   behind the record's accrual cursor
    pub fn withdraw(&self, account: &AccountId) -> Result<WithdrawalReceipt, StakeError> {
        let mut guard = self.state.write();
        self.withdraw_locked(&mut guard, account)
            .inspect_err(|e| Self::log_rejection("withdraw", account, e))
    }

    fn withdraw_locked(
        &self,
        state: &mut PlatformState<L, K>,
        account: &AccountId,
    ) -> Result<WithdrawalReceipt, StakeError> {
        let now = self.observe_now()?;
        let record = state.ledger.get(account)?;
        Self::check_cursor(&record, now)?;
        if !record.has_principal() {
            return Err(StakeError::NothingStaked);
        }
        if !self.gate.is_unlocked(&record, now) {
            return Err(StakeError::LockNotExpired {
                elapsed: self.gate.elapsed(&record, now),
                required: self.gate.lock_duration_secs(),
            });
        }

        let settled = self.accrual.settle(&record, now)?;
        let receipt = WithdrawalReceipt {
            principal: settled.principal,
            reward: settled.settled_reward,
        };

        state.ledger.upsert(account, StakeRecord::ZERO)?;
        if let Err(failure) = Self::release(&mut state.custody, account, &receipt) {
            let restored = if failure.reward_kept {
                // The reward left custody for good; only the principal is still owed.
                StakeRecord { settled_reward: 0, ..settled }
            } else {
                record
            };
            warn!(%account, reward_kept = failure.reward_kept, "withdrawal rolled back: {}", failure.error);
            Self::restore(&mut state.ledger, account, restored)?;
            return Err(failure.error.into());
        }

        info!(
            %account,
            principal = %receipt.principal,
            reward = %receipt.reward,
            "withdrawal completed"
        );
        Ok(receipt)
    }

    /// Move the reward leg, then the principal leg. A principal failure
    /// reverses the reward leg so custody ends where it started; if the
    /// reversal also fails the reward stays with the account.
    fn release(
        custody: &mut K,
        account: &AccountId,
        receipt: &WithdrawalReceipt,
    ) -> Result<(), ReleaseFailure> {
        if receipt.reward > 0 {
            custody
                .pay_reward(account, receipt.reward)
                .map_err(|error| ReleaseFailure { error, reward_kept: false })?;
        }
        if let Err(error) = custody.push_out(account, receipt.principal) {
            let mut reward_kept = false;
            if receipt.reward > 0 {
                if let Err(rev) = custody.reverse_reward(account, receipt.reward) {
                    error!(%account, reward = %receipt.reward, "reward reversal failed: {rev}");
                    reward_kept = true;
                }
            }
            return Err(ReleaseFailure { error, reward_kept });
        }
        Ok(())
    }

    /// Put back a record replaced earlier in the same operation.
    fn restore(ledger: &mut L, account: &AccountId, record: StakeRecord) -> Result<(), StakeError> {
        ledger.upsert(account, record).map_err(|e| {
            error!(%account, "ledger rollback failed: {e}");
            StakeError::from(e)
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Principal currently staked by `account`.
    pub fn stake_of(&self, account: &AccountId) -> Result<Amount, StakeError> {
        Ok(self.state.read().ledger.get(account)?.principal)
    }

    /// Settled plus pending reward at the current time. Zero for Empty accounts.
    pub fn pending_reward(&self, account: &AccountId) -> Result<Amount, StakeError> {
        // Observe under the lock so no writer can advance a cursor past `now`.
        let state = self.state.read();
        let now = self.observe_now()?;
        let record = state.ledger.get(account)?;
        if record.is_zero() {
            return Ok(0);
        }
        Ok(self.accrual.preview_reward(&record, now)?)
    }

    /// Full stored record (zero record for unknown accounts).
    pub fn stake_record(&self, account: &AccountId) -> Result<StakeRecord, StakeError> {
        Ok(self.state.read().ledger.get(account)?)
    }

    /// Derived lifecycle state at the current time.
    pub fn account_state(&self, account: &AccountId) -> Result<AccountState, StakeError> {
        let state = self.state.read();
        let now = self.observe_now()?;
        let record = state.ledger.get(account)?;
        Self::check_cursor(&record, now)?;
        Ok(self.gate.state(&record, now))
    }

    /// When `account` becomes withdrawable; `None` if nothing is staked.
    pub fn unlock_time(&self, account: &AccountId) -> Result<Option<Timestamp>, StakeError> {
        let record = self.state.read().ledger.get(account)?;
        Ok(self.gate.unlock_time(&record))
    }

    pub fn total_staked(&self) -> Result<Amount, StakeError> {
        Ok(self.state.read().ledger.total_staked()?)
    }

    /// Number of accounts with principal staked.
    pub fn account_count(&self) -> Result<usize, StakeError> {
        Ok(self.state.read().ledger.account_count()?)
    }

    /// Reward asset left in the custody reserve.
    pub fn reward_reserve(&self) -> Amount {
        self.state.read().custody.reward_reserve()
    }

    /// Inspect the custody collaborator.
    pub fn with_custody<R>(&self, f: impl FnOnce(&K) -> R) -> R {
        f(&self.state.read().custody)
    }

    /// Mutate the custody collaborator (funding wallets, approvals) under the platform lock.
    pub fn with_custody_mut<R>(&self, f: impl FnOnce(&mut K) -> R) -> R {
        f(&mut self.state.write().custody)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakelock_core::config::AssetMode;
    use stakelock_core::constants::{DEFAULT_LOCK_DURATION_SECS, SECONDS_PER_DAY, UNIT};
    use stakelock_core::error::AccrualError;

    use crate::clock::ManualClock;

    const DAY: u64 = SECONDS_PER_DAY;
    const LOCK: u64 = DEFAULT_LOCK_DURATION_SECS;
    const T0: u64 = 1_700_000_000;

    fn acct(seed: u8) -> AccountId {
        AccountId([seed; 20])
    }

    fn setup(config: EngineConfig) -> (MemoryPlatform, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let platform = MemoryPlatform::in_memory(config, clock.clone()).unwrap();
        platform.with_custody_mut(|c| {
            for seed in 1..=4 {
                c.fund(&acct(seed), 20_000 * UNIT).unwrap();
                c.approve(&acct(seed), 20_000 * UNIT);
            }
        });
        (platform, clock)
    }

    fn native() -> (MemoryPlatform, Arc<ManualClock>) {
        setup(EngineConfig::default())
    }

    // --- deposit ---

    #[test]
    fn first_deposit_anchors_lock() {
        let (p, _clock) = native();
        let receipt = p.deposit(&acct(1), 10 * UNIT).unwrap();
        assert_eq!(receipt.principal, 10 * UNIT);
        assert_eq!(receipt.unlocks_at, T0 + LOCK);

        let r = p.stake_record(&acct(1)).unwrap();
        assert_eq!(r.lock_anchor, Some(T0));
        assert_eq!(r.accrual_cursor, T0);
        assert_eq!(r.settled_reward, 0);
        assert_eq!(p.total_staked().unwrap(), 10 * UNIT);
    }

    #[test]
    fn restake_keeps_anchor_and_folds_reward() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(2 * DAY);
        let receipt = p.deposit(&acct(1), 10 * UNIT).unwrap();

        assert_eq!(receipt.principal, 20 * UNIT);
        assert_eq!(receipt.settled_reward, 20 * UNIT);
        assert_eq!(receipt.unlocks_at, T0 + LOCK);
        let r = p.stake_record(&acct(1)).unwrap();
        assert_eq!(r.lock_anchor, Some(T0));
        assert_eq!(r.accrual_cursor, T0 + 2 * DAY);
    }

    #[test]
    fn zero_deposit_rejected() {
        let (p, _clock) = native();
        assert_eq!(p.deposit(&acct(1), 0), Err(StakeError::InvalidAmount));
        assert_eq!(p.account_count().unwrap(), 0);
    }

    #[test]
    fn cap_rejection_leaves_state() {
        let (p, _clock) = native();
        p.deposit(&acct(1), 50 * UNIT).unwrap();
        let before = p.stake_record(&acct(1)).unwrap();
        let err = p.deposit(&acct(1), 10 * UNIT).unwrap_err();
        assert!(matches!(err, StakeError::AccountCapExceeded { .. }));
        assert_eq!(err.to_string(), format!(
            "max staking amount per account is reached: {} + {} > {}",
            50 * UNIT, 10 * UNIT, 50 * UNIT
        ));
        assert_eq!(p.stake_record(&acct(1)).unwrap(), before);
        assert_eq!(p.with_custody(|c| c.holdings()), 50 * UNIT);
    }

    #[test]
    fn platform_cap_enforced_in_native_mode() {
        let cfg = EngineConfig {
            per_account_cap: 60 * UNIT,
            platform_cap: Some(100 * UNIT),
            ..EngineConfig::default()
        };
        let (p, _clock) = setup(cfg);
        p.deposit(&acct(1), 60 * UNIT).unwrap();
        p.deposit(&acct(2), 40 * UNIT).unwrap();
        let err = p.deposit(&acct(3), 1).unwrap_err();
        assert!(matches!(err, StakeError::PlatformCapExceeded { .. }));
        assert_eq!(p.total_staked().unwrap(), 100 * UNIT);
    }

    #[test]
    fn token_mode_has_no_platform_cap() {
        let cfg = EngineConfig {
            per_account_cap: 10_000 * UNIT,
            ..EngineConfig::token_mode()
        };
        let (p, _clock) = setup(cfg);
        for seed in 1..=4 {
            p.deposit(&acct(seed), 10_000 * UNIT).unwrap();
        }
        assert_eq!(p.total_staked().unwrap(), 40_000 * UNIT);
        assert_eq!(p.with_custody(|c| c.wrapped_supply()), 0);
    }

    #[test]
    fn declined_pull_in_rolls_back() {
        let (p, _clock) = native();
        let stranger = acct(9);
        let err = p.deposit(&stranger, UNIT).unwrap_err();
        assert!(matches!(
            err,
            StakeError::CustodyTransferFailed(CustodyError::InsufficientBalance { .. })
        ));
        assert_eq!(p.stake_record(&stranger).unwrap(), StakeRecord::ZERO);
        assert_eq!(p.total_staked().unwrap(), 0);
    }

    #[test]
    fn declined_restake_restores_previous_record() {
        let cfg = EngineConfig::token_mode();
        let (p, clock) = setup(cfg);
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        let before = p.stake_record(&acct(1)).unwrap();
        p.with_custody_mut(|c| c.approve(&acct(1), 0));
        clock.advance(DAY);
        assert!(p.deposit(&acct(1), 10 * UNIT).is_err());
        assert_eq!(p.stake_record(&acct(1)).unwrap(), before);
    }

    // --- withdraw ---

    #[test]
    fn withdraw_empty_is_nothing_staked() {
        let (p, _clock) = native();
        assert_eq!(p.withdraw(&acct(1)), Err(StakeError::NothingStaked));
    }

    #[test]
    fn withdraw_before_unlock_reports_elapsed() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK - 1);
        assert_eq!(
            p.withdraw(&acct(1)),
            Err(StakeError::LockNotExpired {
                elapsed: LOCK - 1,
                required: LOCK
            })
        );
    }

    #[test]
    fn withdraw_at_unlock_pays_and_resets() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK);
        let receipt = p.withdraw(&acct(1)).unwrap();
        assert_eq!(receipt.principal, 10 * UNIT);
        assert_eq!(receipt.reward, 900 * UNIT);

        assert_eq!(p.stake_of(&acct(1)).unwrap(), 0);
        assert_eq!(p.pending_reward(&acct(1)).unwrap(), 0);
        assert_eq!(p.stake_record(&acct(1)).unwrap(), StakeRecord::ZERO);
        assert_eq!(p.account_state(&acct(1)).unwrap(), AccountState::Empty);
        p.with_custody(|c| {
            assert_eq!(c.balance_of(&acct(1)), 20_000 * UNIT);
            assert_eq!(c.reward_balance_of(&acct(1)), 900 * UNIT);
            assert_eq!(c.wrapped_supply(), 0);
        });
    }

    #[test]
    fn reserve_shortfall_rolls_back() {
        let cfg = EngineConfig {
            initial_reward_reserve: 100 * UNIT,
            ..EngineConfig::default()
        };
        let (p, clock) = setup(cfg);
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK);
        let stake_before = p.stake_of(&acct(1)).unwrap();
        let reward_before = p.pending_reward(&acct(1)).unwrap();

        let err = p.withdraw(&acct(1)).unwrap_err();
        assert!(matches!(
            err,
            StakeError::CustodyTransferFailed(CustodyError::InsufficientReserve { .. })
        ));
        assert_eq!(p.stake_of(&acct(1)).unwrap(), stake_before);
        assert_eq!(p.pending_reward(&acct(1)).unwrap(), reward_before);
        assert_eq!(p.reward_reserve(), 100 * UNIT);
    }

    #[test]
    fn principal_leg_failure_reverses_reward() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK);
        let reserve = p.reward_reserve();
        let record = p.stake_record(&acct(1)).unwrap();
        p.with_custody_mut(|c| c.set_outbound_frozen(true));

        assert!(matches!(
            p.withdraw(&acct(1)),
            Err(StakeError::CustodyTransferFailed(CustodyError::Declined(_)))
        ));
        assert_eq!(p.reward_reserve(), reserve);
        assert_eq!(p.with_custody(|c| c.reward_balance_of(&acct(1))), 0);
        assert_eq!(p.stake_record(&acct(1)).unwrap(), record);

        p.with_custody_mut(|c| c.set_outbound_frozen(false));
        assert_eq!(p.withdraw(&acct(1)).unwrap().reward, 900 * UNIT);
    }

    #[test]
    fn restake_after_unlock_is_permitted() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK + DAY);
        p.deposit(&acct(1), 5 * UNIT).unwrap();
        assert_eq!(p.account_state(&acct(1)).unwrap(), AccountState::Unlockable);
        let receipt = p.withdraw(&acct(1)).unwrap();
        assert_eq!(receipt.principal, 15 * UNIT);
        assert_eq!(receipt.reward, 910 * UNIT);
    }

    #[test]
    fn new_lifecycle_after_withdrawal_reanchors() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK);
        p.withdraw(&acct(1)).unwrap();
        clock.advance(DAY);
        let receipt = p.deposit(&acct(1), 10 * UNIT).unwrap();
        assert_eq!(receipt.settled_reward, 0);
        assert_eq!(receipt.unlocks_at, T0 + LOCK + DAY + LOCK);
    }

    // --- clock ---

    #[test]
    fn clock_regression_is_fatal_and_harmless() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        let before = p.stake_record(&acct(1)).unwrap();
        clock.set(T0 - 1);
        let err = p.deposit(&acct(1), UNIT).unwrap_err();
        assert_eq!(err, StakeError::ClockRegression { last: T0, now: T0 - 1 });
        assert!(err.is_fatal());
        assert!(p.pending_reward(&acct(1)).unwrap_err().is_fatal());
        assert_eq!(p.stake_record(&acct(1)).unwrap(), before);
    }

    #[test]
    fn constant_clock_is_tolerated() {
        let (p, _clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        assert_eq!(p.pending_reward(&acct(1)).unwrap(), 0);
    }

    #[test]
    fn cursor_ahead_of_clock_is_fatal_after_reopen() {
        let mut ledger = MemoryLedger::new();
        let record = StakeRecord {
            principal: 10 * UNIT,
            lock_anchor: Some(T0 - LOCK),
            accrual_cursor: T0 + 1_000,
            settled_reward: 0,
        };
        ledger.upsert(&acct(1), record).unwrap();

        let config = EngineConfig::default();
        let custody = MemoryCustody::for_ledger(&config, &ledger).unwrap();
        let clock = Arc::new(ManualClock::new(T0 + 500));
        let p = StakingPlatform::new(config, ledger, custody, clock).unwrap();

        let regression = StakeError::ClockRegression { last: T0 + 1_000, now: T0 + 500 };
        assert_eq!(p.withdraw(&acct(1)), Err(regression.clone()));
        assert_eq!(p.account_state(&acct(1)), Err(regression.clone()));
        assert_eq!(p.deposit(&acct(1), UNIT), Err(regression.clone()));
        assert!(p.pending_reward(&acct(1)).unwrap_err().is_fatal());
        assert_eq!(p.stake_record(&acct(1)).unwrap(), record);
        assert_eq!(p.with_custody(|c| c.holdings()), 10 * UNIT);
    }

    // --- queries ---

    #[test]
    fn queries_on_unknown_account() {
        let (p, _clock) = native();
        assert_eq!(p.stake_of(&acct(4)).unwrap(), 0);
        assert_eq!(p.pending_reward(&acct(4)).unwrap(), 0);
        assert_eq!(p.unlock_time(&acct(4)).unwrap(), None);
        assert_eq!(p.account_state(&acct(4)).unwrap(), AccountState::Empty);
    }

    #[test]
    fn wrapped_supply_tracks_total_staked() {
        let (p, clock) = native();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        p.deposit(&acct(2), 30 * UNIT).unwrap();
        assert_eq!(p.with_custody(|c| c.wrapped_supply()), p.total_staked().unwrap());
        clock.advance(LOCK);
        p.withdraw(&acct(1)).unwrap();
        assert_eq!(p.with_custody(|c| c.wrapped_supply()), p.total_staked().unwrap());
        assert_eq!(p.total_staked().unwrap(), 30 * UNIT);
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = EngineConfig {
            asset_mode: AssetMode::Token,
            ..EngineConfig::default()
        };
        let clock = Arc::new(ManualClock::new(T0));
        assert!(matches!(
            MemoryPlatform::in_memory(cfg, clock),
            Err(ConfigError::PlatformCapInTokenMode)
        ));
    }

    // --- irreversible reward ---

    /// Custody whose reward payouts cannot be taken back.
    struct OneWayReward(MemoryCustody);

    impl Custody for OneWayReward {
        fn pull_in(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
            self.0.pull_in(account, amount)
        }
        fn push_out(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
            self.0.push_out(account, amount)
        }
        fn pay_reward(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
            self.0.pay_reward(account, amount)
        }
        fn reverse_reward(&mut self, _: &AccountId, _: Amount) -> Result<(), CustodyError> {
            Err(CustodyError::Declined("reward already settled".into()))
        }
        fn reward_reserve(&self) -> Amount {
            self.0.reward_reserve()
        }
    }

    #[test]
    fn unreversed_reward_is_not_paid_twice() {
        let config = EngineConfig::default();
        let clock = Arc::new(ManualClock::new(T0));
        let custody = OneWayReward(MemoryCustody::from_config(&config));
        let p = StakingPlatform::new(config, MemoryLedger::new(), custody, clock.clone()).unwrap();
        p.with_custody_mut(|c| c.0.fund(&acct(1), 10 * UNIT)).unwrap();
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        clock.advance(LOCK);

        p.with_custody_mut(|c| c.0.set_outbound_frozen(true));
        let err = p.withdraw(&acct(1)).unwrap_err();
        assert!(matches!(err, StakeError::CustodyTransferFailed(CustodyError::Declined(_))));

        let r = p.stake_record(&acct(1)).unwrap();
        assert_eq!(r.principal, 10 * UNIT);
        assert_eq!(r.lock_anchor, Some(T0));
        assert_eq!(r.accrual_cursor, T0 + LOCK);
        assert_eq!(r.settled_reward, 0);
        assert_eq!(p.pending_reward(&acct(1)).unwrap(), 0);
        assert_eq!(p.total_staked().unwrap(), 10 * UNIT);

        p.with_custody_mut(|c| c.0.set_outbound_frozen(false));
        let receipt = p.withdraw(&acct(1)).unwrap();
        assert_eq!(receipt, WithdrawalReceipt { principal: 10 * UNIT, reward: 0 });
        p.with_custody(|c| {
            assert_eq!(c.0.reward_balance_of(&acct(1)), 900 * UNIT);
            assert_eq!(c.0.balance_of(&acct(1)), 10 * UNIT);
        });
    }

    // --- custom accrual ---

    struct Overflowing;

    impl AccrualCalculator for Overflowing {
        fn earned(&self, principal: Amount, elapsed: u64) -> Result<Amount, AccrualError> {
            if principal > 0 && elapsed > 0 {
                Err(AccrualError::ArithmeticOverflow)
            } else {
                Ok(0)
            }
        }
    }

    #[test]
    fn accrual_overflow_aborts_without_mutation() {
        let (p, clock) = native();
        let p = p.with_accrual(Arc::new(Overflowing));
        p.deposit(&acct(1), 10 * UNIT).unwrap();
        let before = p.stake_record(&acct(1)).unwrap();
        clock.advance(LOCK);
        assert_eq!(p.withdraw(&acct(1)), Err(StakeError::ArithmeticOverflow));
        assert_eq!(p.stake_record(&acct(1)).unwrap(), before);
    }
}

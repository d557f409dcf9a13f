//! In-memory custody collaborator.
//!
//! Models the asset side of the platform: account wallets for the stake
//! asset, token allowances, the engine's custody holdings, the wrapped-token
//! supply in native mode, and the pre-funded reward reserve. Every transfer
//! either fully applies or leaves all balances untouched.

use std::collections::HashMap;

use stakelock_core::config::{AssetMode, EngineConfig};
use stakelock_core::error::{CustodyError, LedgerError};
use stakelock_core::ledger::LedgerStore;
use stakelock_core::traits::Custody;
use stakelock_core::types::{AccountId, Amount};

fn credit(balance: Amount, amount: Amount) -> Result<Amount, CustodyError> {
    balance
        .checked_add(amount)
        .ok_or_else(|| CustodyError::Declined("balance overflow".into()))
}

/// Custody backed by in-memory balances.
#[derive(Debug, Clone)]
pub struct MemoryCustody {
    mode: AssetMode,
    /// Stake-asset wallet balances (native coin in native mode).
    balances: HashMap<AccountId, Amount>,
    /// Token allowances granted to the engine (token mode only).
    allowances: HashMap<AccountId, Amount>,
    /// Stake asset held by the engine.
    holdings: Amount,
    /// Wrapped-token supply minted against native deposits.
    wrapped_supply: Amount,
    reward_reserve: Amount,
    reward_balances: HashMap<AccountId, Amount>,
    /// When set, `push_out` declines every transfer.
    outbound_frozen: bool,
}

impl MemoryCustody {
    /// Empty custody with `reward_reserve` pre-funded.
    pub fn new(mode: AssetMode, reward_reserve: Amount) -> Self {
        Self {
            mode,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            holdings: 0,
            wrapped_supply: 0,
            reward_reserve,
            reward_balances: HashMap::new(),
            outbound_frozen: false,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.asset_mode, config.initial_reward_reserve)
    }

    /// Custody for a platform reopened over `ledger`: holdings (and the
    /// wrapped supply in native mode) start at the ledger's staked total.
    pub fn for_ledger<L: LedgerStore>(config: &EngineConfig, ledger: &L) -> Result<Self, LedgerError> {
        Ok(Self::from_config(config).with_holdings(ledger.total_staked()?))
    }

    /// Set engine holdings to `amount`, wrapping it in native mode.
    pub fn with_holdings(mut self, amount: Amount) -> Self {
        self.holdings = amount;
        self.wrapped_supply = match self.mode {
            AssetMode::Native => amount,
            AssetMode::Token => 0,
        };
        self
    }

    pub fn mode(&self) -> AssetMode {
        self.mode
    }

    /// Credit `amount` of the stake asset to an account wallet.
    pub fn fund(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        let balance = self.balance_of(account);
        self.balances.insert(*account, credit(balance, amount)?);
        Ok(())
    }

    /// Set the allowance `account` grants the engine (token mode).
    pub fn approve(&mut self, account: &AccountId, amount: Amount) {
        self.allowances.insert(*account, amount);
    }

    /// Add reward asset to the reserve.
    pub fn fund_reserve(&mut self, amount: Amount) -> Result<(), CustodyError> {
        self.reward_reserve = credit(self.reward_reserve, amount)?;
        Ok(())
    }

    /// Freeze or thaw outbound stake-asset transfers.
    pub fn set_outbound_frozen(&mut self, frozen: bool) {
        self.outbound_frozen = frozen;
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance_of(&self, account: &AccountId) -> Amount {
        self.allowances.get(account).copied().unwrap_or(0)
    }

    pub fn reward_balance_of(&self, account: &AccountId) -> Amount {
        self.reward_balances.get(account).copied().unwrap_or(0)
    }

    /// Stake asset currently held by the engine.
    pub fn holdings(&self) -> Amount {
        self.holdings
    }

    /// Wrapped-token supply. Always zero in token mode.
    pub fn wrapped_supply(&self) -> Amount {
        self.wrapped_supply
    }
}

impl Custody for MemoryCustody {
    fn pull_in(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        let balance = self.balance_of(account);
        if balance < amount {
            return Err(CustodyError::InsufficientBalance { have: balance, need: amount });
        }
        let holdings = credit(self.holdings, amount)?;

        match self.mode {
            AssetMode::Token => {
                let allowance = self.allowance_of(account);
                if allowance < amount {
                    return Err(CustodyError::InsufficientAllowance { have: allowance, need: amount });
                }
                self.allowances.insert(*account, allowance - amount);
            }
            AssetMode::Native => {
                self.wrapped_supply = credit(self.wrapped_supply, amount)?;
            }
        }

        self.balances.insert(*account, balance - amount);
        self.holdings = holdings;
        Ok(())
    }

    fn push_out(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        if self.outbound_frozen {
            return Err(CustodyError::Declined("outbound transfers frozen".into()));
        }
        if self.holdings < amount {
            return Err(CustodyError::InsufficientHoldings { have: self.holdings, need: amount });
        }
        let balance = credit(self.balance_of(account), amount)?;

        if self.mode == AssetMode::Native {
            // Unwrap before release; supply tracks holdings one-to-one.
            self.wrapped_supply = self.wrapped_supply.saturating_sub(amount);
        }
        self.holdings -= amount;
        self.balances.insert(*account, balance);
        Ok(())
    }

    fn pay_reward(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        if self.reward_reserve < amount {
            return Err(CustodyError::InsufficientReserve { have: self.reward_reserve, need: amount });
        }
        let paid = credit(self.reward_balance_of(account), amount)?;
        self.reward_reserve -= amount;
        self.reward_balances.insert(*account, paid);
        Ok(())
    }

    fn reverse_reward(&mut self, account: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        let paid = self.reward_balance_of(account);
        if paid < amount {
            return Err(CustodyError::InsufficientBalance { have: paid, need: amount });
        }
        self.reward_reserve = credit(self.reward_reserve, amount)?;
        self.reward_balances.insert(*account, paid - amount);
        Ok(())
    }

    fn reward_reserve(&self) -> Amount {
        self.reward_reserve
    }
}

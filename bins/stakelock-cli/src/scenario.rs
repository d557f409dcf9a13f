//! Scenario replay: a JSON script of timed deposits, withdrawals, and
//! queries executed against a platform driven by a [`ManualClock`].

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use stakelock_core::constants::UNIT;
use stakelock_core::error::StakeError;
use stakelock_core::ledger::LedgerStore;
use stakelock_core::types::{
    AccountId, AccountState, Amount, DepositReceipt, Timestamp, WithdrawalReceipt,
};
use stakelock_platform::{ManualClock, MemoryCustody, StakingPlatform};

/// Wallet funding for one account, in whole units.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountFunding {
    pub balance_units: u64,
    /// Token-mode allowance; defaults to the full balance.
    pub allowance_units: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Deposit { account: AccountId, amount_units: u64 },
    Withdraw { account: AccountId },
    Query { account: AccountId },
}

impl Action {
    fn account(&self) -> &AccountId {
        match self {
            Self::Deposit { account, .. } | Self::Withdraw { account } | Self::Query { account } => {
                account
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Seconds after the scenario start.
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Unix time of offset zero.
    #[serde(default)]
    pub start: Timestamp,
    #[serde(default)]
    pub accounts: BTreeMap<AccountId, AccountFunding>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(text).context("parsing scenario")?;
        if scenario.steps.windows(2).any(|w| w[1].at < w[0].at) {
            bail!("scenario steps must be ordered by time");
        }
        Ok(scenario)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Deposited(DepositReceipt),
    Withdrawn(WithdrawalReceipt),
    Queried {
        stake: Amount,
        pending_reward: Amount,
        state: AccountState,
    },
    Rejected {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub at: Timestamp,
    pub account: AccountId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Fund wallets, then run every step in order.
///
/// Rejections are reported per step; fatal errors abort the replay.
pub fn replay<L: LedgerStore>(
    platform: &StakingPlatform<L, MemoryCustody>,
    clock: &Arc<ManualClock>,
    scenario: &Scenario,
) -> Result<Vec<StepReport>> {
    platform.with_custody_mut(|custody| -> Result<()> {
        for (account, funding) in &scenario.accounts {
            custody.fund(account, funding.balance_units as Amount * UNIT)?;
            let allowance = funding.allowance_units.unwrap_or(funding.balance_units);
            custody.approve(account, allowance as Amount * UNIT);
        }
        Ok(())
    })?;

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        let at = scenario
            .start
            .checked_add(step.at)
            .context("step time overflows")?;
        clock.set(at);

        let account = *step.action.account();
        let outcome = match &step.action {
            Action::Deposit { amount_units, .. } => platform
                .deposit(&account, *amount_units as Amount * UNIT)
                .map(Outcome::Deposited),
            Action::Withdraw { .. } => platform.withdraw(&account).map(Outcome::Withdrawn),
            Action::Query { .. } => query(platform, &account),
        };

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) if e.is_fatal() => bail!("step at +{}s aborted: {e}", step.at),
            Err(e) => Outcome::Rejected { error: e.to_string() },
        };
        reports.push(StepReport { at, account, outcome });
    }

    info!(steps = reports.len(), "scenario replay complete");
    Ok(reports)
}

fn query<L: LedgerStore>(
    platform: &StakingPlatform<L, MemoryCustody>,
    account: &AccountId,
) -> Result<Outcome, StakeError> {
    Ok(Outcome::Queried {
        stake: platform.stake_of(account)?,
        pending_reward: platform.pending_reward(account)?,
        state: platform.account_state(account)?,
    })
}

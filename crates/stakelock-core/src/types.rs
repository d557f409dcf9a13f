//! Core ledger types: account identifiers, stake records, derived account state.
//!
//! All monetary values are base units (see [`UNIT`](crate::constants::UNIT)).
//! All timestamps are Unix seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed-point token amount in base units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A 20-byte account identifier, rendered as `0x`-prefixed lowercase hex.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// The zero account. Never a valid depositor in practice, but harmless as a key.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an AccountId from a byte array.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| ConfigError::InvalidAccount(format!("{s}: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| ConfigError::InvalidAccount(format!("{s}: {} bytes, expected 20", v.len())))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for AccountId {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

impl From<[u8; 20]> for AccountId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Per-account staking state.
///
/// The all-zero record (`StakeRecord::default()`) is the Empty state. The
/// ledger never stores it; a missing entry is synthesized as the zero record.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct StakeRecord {
    /// Staked amount currently locked.
    pub principal: Amount,
    /// Time of the first deposit of the current staking lifecycle.
    pub lock_anchor: Option<Timestamp>,
    /// Time up to which reward has been folded into `settled_reward`.
    pub accrual_cursor: Timestamp,
    /// Reward computed and owed but not yet paid out.
    pub settled_reward: Amount,
}

impl StakeRecord {
    /// The Empty record.
    pub const ZERO: Self = Self {
        principal: 0,
        lock_anchor: None,
        accrual_cursor: 0,
        settled_reward: 0,
    };

    /// Whether this record is the all-zero Empty state.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Whether anything is staked.
    pub fn has_principal(&self) -> bool {
        self.principal > 0
    }
}

/// Lifecycle state of an account, derived from its record and the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccountState {
    /// Nothing staked.
    Empty,
    /// Principal staked; withdrawal opens at `unlocks_at`.
    Locked { unlocks_at: Timestamp },
    /// Principal staked and the lock period has elapsed.
    Unlockable,
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Locked { unlocks_at } => write!(f, "locked until {unlocks_at}"),
            Self::Unlockable => write!(f, "unlockable"),
        }
    }
}

/// Outcome of an accepted deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Amount moved into custody.
    pub amount: Amount,
    /// Principal after the deposit.
    pub principal: Amount,
    /// Settled reward after folding pending accrual.
    pub settled_reward: Amount,
    /// Time at which the account becomes withdrawable.
    pub unlocks_at: Timestamp,
}

/// Outcome of a completed withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// Stake asset returned to the account.
    pub principal: Amount,
    /// Reward asset paid from the reserve.
    pub reward: Amount,
}

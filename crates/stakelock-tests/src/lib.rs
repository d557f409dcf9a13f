//! Integration test suite for Stakelock.
//!
//! The tests in `tests/` drive a full [`stakelock_platform::StakingPlatform`]
//! through the documented staking scenarios and then try to break its
//! invariants: cap bypass, early withdrawal, partial settlement on custody
//! failure, clock regression, and aggregate drift.

pub mod helpers;

//! # stakelock-platform — Settlement coordinator and its collaborators.
//!
//! Composes the Stakelock subsystems into a running staking platform:
//! - [`platform::StakingPlatform`] — deposit/withdraw state machine over a ledger and custody
//! - [`custody::MemoryCustody`] — in-memory asset custody with wrapping and a reward reserve
//! - [`clock`] — wall-clock and manually driven time sources
//! - [`storage::RocksLedger`] — persistent stake ledger backed by RocksDB
//! - [`settings::Settings`] — file and environment configuration

pub mod clock;
pub mod custody;
pub mod platform;
pub mod settings;
pub mod storage;

pub use clock::{ManualClock, SystemClock};
pub use custody::MemoryCustody;
pub use platform::{MemoryPlatform, StakingPlatform};
pub use settings::Settings;
pub use storage::RocksLedger;

//! # stakelock-core
//! Foundation types, traits, and the stake ledger for the Stakelock engine.

pub mod cap;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod traits;
pub mod types;

//! # stakelock-accrual — Continuous-time reward accrual.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Linear accrual**: `earned = principal * elapsed * rate / (SECONDS_PER_DAY * RATE_PRECISION)`.
//! - **Multiply before divide**: the full product is divided exactly once,
//!   truncating toward zero, so reward never rounds up in the holder's favour.
//! - **Checked arithmetic**: overflow is an error, never a wrap.

pub mod engine;
pub mod fixed;

pub use engine::AccrualEngine;
pub use fixed::mul_div;

//! Delayed-withdrawal types.
//!
//! A delayed withdrawal is the self-service exit: no sequencer signature is
//! needed, only patience.
//!
//! ```text
//!   start_withdrawal ──▶ PENDING ── delay elapsed ──▶ execute ──▶ (removed)
//! ```
//!
//! Executing a handle that is not pending (never started, or already
//! executed) is a successful zero-value transfer, so retries are always safe.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Identifies one pending withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WithdrawalKey {
    /// The account that started the withdrawal.
    pub account: Address,
    /// Timestamp recorded by `start_withdrawal`.
    pub start_time: u64,
    /// Caller-chosen nonce distinguishing withdrawals started in the same second.
    pub nonce: U256,
}

/// Returned by `start_withdrawal`; pass `start_time` and `nonce` back to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalHandle {
    pub key: WithdrawalKey,
    pub amount: U256,
    /// Earliest timestamp at which execution succeeds.
    pub executable_after: u64,
}

impl WithdrawalHandle {
    #[must_use]
    pub fn start_time(&self) -> u64 {
        self.key.start_time
    }

    #[must_use]
    pub fn nonce(&self) -> U256 {
        self.key.nonce
    }
}

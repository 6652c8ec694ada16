//! Supply conservation invariant checker.
//!
//! Mathematical invariant enforced by the ledger:
//! ```text
//! Σ balances == Σ deposits − Σ withdrawals
//! ```
//!
//! Settlements only move value between accounts, so they never change either
//! side. If this ever breaks, value was created or destroyed inside the pool.

use alloy_primitives::U256;
use sealedpool_types::{Result, SealedPoolError};

/// Running totals of value that entered and left custody.
#[derive(Debug, Default, Clone)]
pub struct SupplyConservation {
    deposits: U256,
    withdrawals: U256,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record value entering custody. Saturates: the ledger's own checked
    /// total overflows long before this could.
    pub fn record_deposit(&mut self, amount: U256) {
        self.deposits = self.deposits.saturating_add(amount);
    }

    /// Record value leaving custody.
    pub fn record_withdrawal(&mut self, amount: U256) {
        self.withdrawals = self.withdrawals.saturating_add(amount);
    }

    /// Expected total supply: deposits − withdrawals.
    #[must_use]
    pub fn expected_supply(&self) -> U256 {
        self.deposits.saturating_sub(self.withdrawals)
    }

    /// Verify that `actual_supply` matches the expected supply.
    ///
    /// # Errors
    /// Returns [`SealedPoolError::SupplyInvariantViolation`] if they differ or
    /// more was withdrawn than ever deposited.
    pub fn verify(&self, actual_supply: U256) -> Result<()> {
        if self.withdrawals > self.deposits || actual_supply != self.expected_supply() {
            return Err(SealedPoolError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {} (deposits={}, withdrawals={})",
                    self.expected_supply(),
                    self.deposits,
                    self.withdrawals,
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_deposits(&self) -> U256 {
        self.deposits
    }

    #[must_use]
    pub fn total_withdrawals(&self) -> U256 {
        self.withdrawals
    }
}

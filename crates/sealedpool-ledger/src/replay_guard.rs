//! Nonce replay guard: each `(account, nonce)` can be consumed once.
//!
//! Both signed withdrawals and action settlements draw from the same
//! per-account nonce space. A nonce is remembered together with the deadline
//! of the attestation that consumed it; once that deadline has passed the
//! attestation can never verify again, so the entry may be pruned.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use sealedpool_types::{Result, SealedPoolError};

/// Tracks consumed `(account, nonce)` pairs.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    consumed: HashMap<(Address, U256), U256>,
}

impl ReplayGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `Replayed` if the pair was already consumed.
    pub fn check(&self, account: Address, nonce: U256) -> Result<()> {
        if self.consumed.contains_key(&(account, nonce)) {
            tracing::warn!(account = %account, nonce = %nonce, "replayed nonce rejected");
            return Err(SealedPoolError::Replayed { account, nonce });
        }
        Ok(())
    }

    /// Mark the pair consumed. `deadline` is the expiry of the attestation
    /// that consumed it.
    ///
    /// # Errors
    /// Returns [`SealedPoolError::Replayed`] if the pair was already consumed.
    pub fn consume(&mut self, account: Address, nonce: U256, deadline: U256) -> Result<()> {
        self.check(account, nonce)?;
        self.consumed.insert((account, nonce), deadline);
        Ok(())
    }

    #[must_use]
    pub fn is_consumed(&self, account: Address, nonce: U256) -> bool {
        self.consumed.contains_key(&(account, nonce))
    }

    /// Forget nonces whose attestation deadline is strictly before `now`.
    /// Returns how many were dropped.
    pub fn prune_expired(&mut self, now: u64) -> usize {
        let before = self.consumed.len();
        let now = U256::from(now);
        self.consumed.retain(|_, deadline| *deadline >= now);
        before - self.consumed.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

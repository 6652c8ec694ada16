//! Time-locked withdrawals.
//!
//! ```text
//!   start(account, amount, nonce, now) ──▶ PENDING
//!   take_ready(key, now):
//!       now <= start_time + delay  ──▶ TooSoon
//!       pending                    ──▶ amount (entry removed)
//!       absent                     ──▶ 0
//! ```
//!
//! Nothing is debited when a withdrawal starts; the ledger is debited when
//! the withdrawal executes, so the account keeps full use of its balance in
//! the meantime and an underfunded execution fails cleanly.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use sealedpool_types::{Result, SealedPoolError, WithdrawalHandle, WithdrawalKey};

/// Pending withdrawals keyed by `(account, start_time, nonce)`.
#[derive(Debug)]
pub struct PendingWithdrawals {
    pending: HashMap<WithdrawalKey, U256>,
    delay_secs: u64,
}

impl PendingWithdrawals {
    /// Create an empty set with the given delay.
    #[must_use]
    pub fn new(delay_secs: u64) -> Self {
        Self {
            pending: HashMap::new(),
            delay_secs,
        }
    }

    #[must_use]
    pub fn delay_secs(&self) -> u64 {
        self.delay_secs
    }

    /// Record a withdrawal started at `now`.
    ///
    /// # Errors
    /// Returns [`SealedPoolError::Replayed`] if the same account already has a
    /// pending withdrawal with this nonce started in the same second.
    pub fn start(
        &mut self,
        account: Address,
        amount: U256,
        nonce: U256,
        now: u64,
    ) -> Result<WithdrawalHandle> {
        let key = WithdrawalKey {
            account,
            start_time: now,
            nonce,
        };
        if self.pending.contains_key(&key) {
            return Err(SealedPoolError::Replayed { account, nonce });
        }
        self.pending.insert(key, amount);
        Ok(WithdrawalHandle {
            key,
            amount,
            executable_after: now.saturating_add(self.delay_secs),
        })
    }

    /// Amount that executing `key` at `now` would pay out, without removing it.
    ///
    /// # Errors
    /// Returns [`SealedPoolError::TooSoon`] until `now > start_time + delay`.
    pub fn ready_amount(&self, key: &WithdrawalKey, now: u64) -> Result<U256> {
        let ready_at = key.start_time.saturating_add(self.delay_secs);
        if now <= ready_at {
            return Err(SealedPoolError::TooSoon { ready_at, now });
        }
        Ok(self.pending.get(key).copied().unwrap_or_default())
    }

    /// Remove `key` and return its amount, or zero if it is not pending.
    pub fn take_ready(&mut self, key: &WithdrawalKey, now: u64) -> Result<U256> {
        let amount = self.ready_amount(key, now)?;
        self.pending.remove(key);
        Ok(amount)
    }

    #[must_use]
    pub fn get(&self, key: &WithdrawalKey) -> Option<U256> {
        self.pending.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealedpool_types::constants::{DAY_SECS, DEFAULT_WITHDRAWAL_DELAY_SECS};

    const T0: u64 = 1_700_000_000;

    fn acct() -> Address {
        Address::repeat_byte(0x11)
    }

    #[test]
    fn start_returns_handle_with_timestamp() {
        let mut pw = PendingWithdrawals::new(DEFAULT_WITHDRAWAL_DELAY_SECS);
        let handle = pw.start(acct(), U256::from(5), U256::from(1), T0).unwrap();
        assert_eq!(handle.start_time(), T0);
        assert_eq!(handle.nonce(), U256::from(1));
        assert_eq!(handle.executable_after, T0 + 7 * DAY_SECS);
        assert_eq!(pw.get(&handle.key), Some(U256::from(5)));
    }

    #[test]
    fn duplicate_start_rejected() {
        let mut pw = PendingWithdrawals::new(DEFAULT_WITHDRAWAL_DELAY_SECS);
        pw.start(acct(), U256::from(5), U256::from(1), T0).unwrap();
        let err = pw
            .start(acct(), U256::from(9), U256::from(1), T0)
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::Replayed { .. }));
        // Same nonce in a later second is a different withdrawal.
        pw.start(acct(), U256::from(9), U256::from(1), T0 + 1)
            .unwrap();
        assert_eq!(pw.len(), 2);
    }

    #[test]
    fn too_soon_after_one_day_and_at_exact_delay() {
        let mut pw = PendingWithdrawals::new(DEFAULT_WITHDRAWAL_DELAY_SECS);
        let h = pw.start(acct(), U256::from(5), U256::ZERO, T0).unwrap();
        assert!(matches!(
            pw.take_ready(&h.key, T0 + DAY_SECS),
            Err(SealedPoolError::TooSoon { .. })
        ));
        assert!(matches!(
            pw.take_ready(&h.key, T0 + DEFAULT_WITHDRAWAL_DELAY_SECS),
            Err(SealedPoolError::TooSoon { .. })
        ));
        assert_eq!(pw.len(), 1);
    }

    #[test]
    fn executes_once_then_moves_zero() {
        let mut pw = PendingWithdrawals::new(DEFAULT_WITHDRAWAL_DELAY_SECS);
        let h = pw.start(acct(), U256::from(5), U256::ZERO, T0).unwrap();
        let later = T0 + 8 * DAY_SECS;
        assert_eq!(pw.take_ready(&h.key, later).unwrap(), U256::from(5));
        assert_eq!(pw.take_ready(&h.key, later).unwrap(), U256::ZERO);
        assert!(pw.is_empty());
    }

    #[test]
    fn unknown_handle_moves_zero_after_delay() {
        let pw = PendingWithdrawals::new(DEFAULT_WITHDRAWAL_DELAY_SECS);
        let key = WithdrawalKey {
            account: acct(),
            start_time: 0,
            nonce: U256::from(42),
        };
        assert_eq!(pw.ready_amount(&key, T0).unwrap(), U256::ZERO);
    }
}

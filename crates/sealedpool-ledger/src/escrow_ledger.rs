//! The escrow balance ledger.
//!
//! Tracks one native-value balance per account. All arithmetic is checked:
//! a debit larger than the balance fails with `InsufficientBalance` and a
//! credit that would overflow fails with `BalanceOverflow`. Nothing wraps and
//! nothing saturates.
//!
//! Multi-step changes go through a [`LedgerBatch`], which is simulated in
//! full before a single balance is written, so either the whole batch lands
//! or the ledger is unchanged.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use sealedpool_types::{Result, SealedPoolError};

use crate::supply_conservation::SupplyConservation;

/// One step of a [`LedgerBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    /// Value entering custody, credited to `to`.
    Deposit { to: Address, amount: U256 },
    /// Value leaving custody, debited from `from`.
    Withdraw { from: Address, amount: U256 },
    /// Internal debit; must be matched by credits in the same batch.
    Debit { from: Address, amount: U256 },
    /// Internal credit; must be matched by debits in the same batch.
    Credit { to: Address, amount: U256 },
}

/// An ordered, all-or-nothing set of ledger operations.
///
/// Internal debits and credits must balance; only `Deposit` and `Withdraw`
/// change the total supply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value entering custody for `to`.
    pub fn deposit(&mut self, to: Address, amount: U256) -> &mut Self {
        self.ops.push(LedgerOp::Deposit { to, amount });
        self
    }

    /// Value leaving custody from `from`.
    pub fn withdraw(&mut self, from: Address, amount: U256) -> &mut Self {
        self.ops.push(LedgerOp::Withdraw { from, amount });
        self
    }

    /// Internal debit.
    pub fn debit(&mut self, from: Address, amount: U256) -> &mut Self {
        self.ops.push(LedgerOp::Debit { from, amount });
        self
    }

    /// Internal credit.
    pub fn credit(&mut self, to: Address, amount: U256) -> &mut Self {
        self.ops.push(LedgerOp::Credit { to, amount });
        self
    }

    /// Debit `from` and credit `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> &mut Self {
        self.debit(from, amount).credit(to, amount)
    }

    #[must_use]
    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Result of simulating a batch: the new balances of touched accounts.
struct Simulation {
    touched: HashMap<Address, U256>,
    inflow: U256,
    outflow: U256,
    total_supply: U256,
}

/// Per-account escrow balances.
///
/// The ledger is the single source of truth for balances. Operators never
/// reach it directly: the settlement engine turns their payouts into batches.
#[derive(Debug, Default)]
pub struct EscrowLedger {
    balances: HashMap<Address, U256>,
    total_supply: U256,
    supply: SupplyConservation,
}

impl EscrowLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `to` with value entering custody. Returns the new balance.
    pub fn deposit(&mut self, to: Address, amount: U256) -> Result<U256> {
        let mut batch = LedgerBatch::new();
        batch.deposit(to, amount);
        self.apply(&batch)?;
        Ok(self.balance_of(to))
    }

    /// Debit `from` for value leaving custody. Returns the new balance.
    pub fn withdraw(&mut self, from: Address, amount: U256) -> Result<U256> {
        let mut batch = LedgerBatch::new();
        batch.withdraw(from, amount);
        self.apply(&batch)?;
        Ok(self.balance_of(from))
    }

    /// Move `amount` between two accounts.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let mut batch = LedgerBatch::new();
        batch.transfer(from, to, amount);
        self.apply(&batch)
    }

    /// Validate a batch without applying it.
    pub fn check(&self, batch: &LedgerBatch) -> Result<()> {
        self.simulate(batch).map(|_| ())
    }

    /// Validate and apply a batch atomically.
    ///
    /// # Errors
    /// - `InsufficientBalance` if any debit exceeds the running balance
    /// - `BalanceOverflow` if any credit overflows
    /// - `Internal` if internal debits and credits do not balance
    pub fn apply(&mut self, batch: &LedgerBatch) -> Result<()> {
        let sim = self.simulate(batch)?;
        for (account, balance) in sim.touched {
            if balance.is_zero() {
                self.balances.remove(&account);
            } else {
                self.balances.insert(account, balance);
            }
        }
        self.total_supply = sim.total_supply;
        self.supply.record_deposit(sim.inflow);
        self.supply.record_withdrawal(sim.outflow);
        Ok(())
    }

    fn simulate(&self, batch: &LedgerBatch) -> Result<Simulation> {
        let mut touched: HashMap<Address, U256> = HashMap::new();
        let mut inflow = U256::ZERO;
        let mut outflow = U256::ZERO;
        let mut debits = U256::ZERO;
        let mut credits = U256::ZERO;

        for op in &batch.ops {
            match *op {
                LedgerOp::Deposit { to, amount } => {
                    Self::add(&mut touched, &self.balances, to, amount)?;
                    inflow = inflow
                        .checked_add(amount)
                        .ok_or(SealedPoolError::BalanceOverflow)?;
                }
                LedgerOp::Credit { to, amount } => {
                    Self::add(&mut touched, &self.balances, to, amount)?;
                    credits = credits
                        .checked_add(amount)
                        .ok_or(SealedPoolError::BalanceOverflow)?;
                }
                LedgerOp::Withdraw { from, amount } => {
                    Self::sub(&mut touched, &self.balances, from, amount)?;
                    outflow = outflow
                        .checked_add(amount)
                        .ok_or(SealedPoolError::BalanceOverflow)?;
                }
                LedgerOp::Debit { from, amount } => {
                    Self::sub(&mut touched, &self.balances, from, amount)?;
                    debits = debits
                        .checked_add(amount)
                        .ok_or(SealedPoolError::BalanceOverflow)?;
                }
            }
        }

        if debits != credits {
            return Err(SealedPoolError::Internal(format!(
                "unbalanced ledger batch: debits {debits} != credits {credits}"
            )));
        }

        let total_supply = self
            .total_supply
            .checked_add(inflow)
            .and_then(|t| t.checked_sub(outflow))
            .ok_or(SealedPoolError::BalanceOverflow)?;

        Ok(Simulation {
            touched,
            inflow,
            outflow,
            total_supply,
        })
    }

    fn current(
        touched: &HashMap<Address, U256>,
        balances: &HashMap<Address, U256>,
        account: Address,
    ) -> U256 {
        touched
            .get(&account)
            .or_else(|| balances.get(&account))
            .copied()
            .unwrap_or_default()
    }

    fn add(
        touched: &mut HashMap<Address, U256>,
        balances: &HashMap<Address, U256>,
        account: Address,
        amount: U256,
    ) -> Result<()> {
        let next = Self::current(touched, balances, account)
            .checked_add(amount)
            .ok_or(SealedPoolError::BalanceOverflow)?;
        touched.insert(account, next);
        Ok(())
    }

    fn sub(
        touched: &mut HashMap<Address, U256>,
        balances: &HashMap<Address, U256>,
        account: Address,
        amount: U256,
    ) -> Result<()> {
        let available = Self::current(touched, balances, account);
        let next = available
            .checked_sub(amount)
            .ok_or(SealedPoolError::InsufficientBalance {
                needed: amount,
                available,
            })?;
        touched.insert(account, next);
        Ok(())
    }

    /// Balance of `account` (zero if unknown).
    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Number of accounts with a non-zero balance.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Recount every balance and compare against the running total and the
    /// deposit/withdrawal history.
    pub fn verify_supply(&self) -> Result<()> {
        let counted = self
            .balances
            .values()
            .try_fold(U256::ZERO, |acc, b| acc.checked_add(*b))
            .ok_or(SealedPoolError::BalanceOverflow)?;
        if counted != self.total_supply {
            return Err(SealedPoolError::SupplyInvariantViolation {
                reason: format!(
                    "counted balances {counted} != running total {}",
                    self.total_supply
                ),
            });
        }
        self.supply.verify(counted)
    }

    /// The deposit/withdrawal history.
    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }
}

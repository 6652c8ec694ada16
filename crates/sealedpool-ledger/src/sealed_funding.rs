//! Sealed funding: commit-then-sweep deposit addresses.
//!
//! A bidder who does not want to reveal interest before an auction settles
//! sends value to an address that is derived from a secret salt and their own
//! address. Nothing links that address to the pool until it is swept.
//!
//! ```text
//!   compute_address(salt, depositor)          (pure, CREATE2)
//!        │
//!        ▼
//!   UNDEPLOYED ── fund(addr, v) ──▶ UNDEPLOYED (held += v)
//!        │
//!        └── sweep ──▶ DEPLOYED (held credited to depositor, rejects funding)
//! ```
//!
//! The address is `create2(factory, keccak256(abi.encode(salt, depositor)),
//! init_code_hash)` where the init-code hash is bound to the pool address, so
//! two pools never share sealed funding addresses.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use sealedpool_types::{Result, SealedPoolError, constants::SEALED_FUNDING_CODE_TAG};

use crate::escrow_ledger::{EscrowLedger, LedgerBatch};

#[derive(Debug, Default, Clone, Copy)]
struct FundingSlot {
    held: U256,
    deployed: bool,
}

/// A validated sweep awaiting commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPlan {
    pub salt: B256,
    pub depositor: Address,
    pub address: Address,
    /// Value held at `address`, to be credited to `depositor`.
    pub amount: U256,
}

/// Deterministic sealed funding addresses and the value they hold.
#[derive(Debug)]
pub struct SealedFundingFactory {
    factory: Address,
    init_code_hash: B256,
    slots: HashMap<Address, FundingSlot>,
}

impl SealedFundingFactory {
    /// Create a factory at `factory` whose sweeps credit `pool`.
    #[must_use]
    pub fn new(factory: Address, pool: Address) -> Self {
        let mut code = Vec::with_capacity(SEALED_FUNDING_CODE_TAG.len() + 20);
        code.extend_from_slice(SEALED_FUNDING_CODE_TAG);
        code.extend_from_slice(pool.as_slice());
        Self {
            factory,
            init_code_hash: keccak256(code),
            slots: HashMap::new(),
        }
    }

    #[must_use]
    pub fn factory_address(&self) -> Address {
        self.factory
    }

    #[must_use]
    pub fn init_code_hash(&self) -> B256 {
        self.init_code_hash
    }

    /// The sealed funding address for `(salt, depositor)`.
    #[must_use]
    pub fn compute_address(&self, salt: B256, depositor: Address) -> Address {
        let inner_salt = keccak256((salt, depositor).abi_encode_params());
        self.factory.create2(inner_salt, self.init_code_hash)
    }

    /// Send `amount` to a sealed funding address. Returns the value now held.
    ///
    /// # Errors
    /// - `SealedFundingDeployed` if the address was already swept
    /// - `BalanceOverflow` if the held value would overflow
    pub fn fund(&mut self, address: Address, amount: U256) -> Result<U256> {
        let slot = self.slots.entry(address).or_default();
        if slot.deployed {
            return Err(SealedPoolError::SealedFundingDeployed(address));
        }
        slot.held = slot
            .held
            .checked_add(amount)
            .ok_or(SealedPoolError::BalanceOverflow)?;
        tracing::debug!(
            address = %address,
            amount = %amount,
            held = %slot.held,
            "sealed funding received"
        );
        Ok(slot.held)
    }

    /// Plan the sweep of one address.
    ///
    /// # Errors
    /// Returns `SealedFundingDeployed` if it was already swept.
    pub fn plan_sweep(&self, salt: B256, depositor: Address) -> Result<SweepPlan> {
        let address = self.compute_address(salt, depositor);
        let slot = self.slots.get(&address).copied().unwrap_or_default();
        if slot.deployed {
            return Err(SealedPoolError::SealedFundingDeployed(address));
        }
        Ok(SweepPlan {
            salt,
            depositor,
            address,
            amount: slot.held,
        })
    }

    /// Plan sweeps for every salt that is not yet deployed. Deployed salts and
    /// repeats within `salts` are skipped.
    #[must_use]
    pub fn plan_sweeps(&self, salts: &[B256], depositor: Address) -> Vec<SweepPlan> {
        let mut seen = HashSet::new();
        salts
            .iter()
            .filter_map(|salt| self.plan_sweep(*salt, depositor).ok())
            .filter(|plan| seen.insert(plan.address))
            .collect()
    }

    /// Add the ledger side of `plans` to `batch`.
    pub fn stage(plans: &[SweepPlan], batch: &mut LedgerBatch) {
        for plan in plans {
            batch.deposit(plan.depositor, plan.amount);
        }
    }

    /// Mark a planned address deployed and release its held value.
    pub fn commit_sweep(&mut self, plan: &SweepPlan) {
        let slot = self.slots.entry(plan.address).or_default();
        slot.held = U256::ZERO;
        slot.deployed = true;
        tracing::info!(
            address = %plan.address,
            depositor = %plan.depositor,
            amount = %plan.amount,
            "sealed funding swept"
        );
    }

    /// Sweep one address into the ledger.
    ///
    /// # Errors
    /// `SealedFundingDeployed` on a second deploy, or any ledger error.
    pub fn deploy(
        &mut self,
        salt: B256,
        depositor: Address,
        ledger: &mut EscrowLedger,
    ) -> Result<SweepPlan> {
        let plan = self.plan_sweep(salt, depositor)?;
        let mut batch = LedgerBatch::new();
        Self::stage(&[plan], &mut batch);
        ledger.apply(&batch)?;
        self.commit_sweep(&plan);
        Ok(plan)
    }

    #[must_use]
    pub fn is_deployed(&self, address: Address) -> bool {
        self.slots.get(&address).is_some_and(|s| s.deployed)
    }

    /// Value currently held at an undeployed address.
    #[must_use]
    pub fn held_balance(&self, address: Address) -> U256 {
        self.slots.get(&address).map(|s| s.held).unwrap_or_default()
    }
}

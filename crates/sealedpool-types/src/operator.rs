//! The operator capability interface.
//!
//! Operators are the pluggable modules (auctions, mints, editions) invoked by
//! the settlement engine once the ledger side of a settlement is known to be
//! valid. They never touch balances: they describe payouts and NFT effects,
//! and the engine applies the payouts to the ledger.
//!
//! ## Two-phase execution
//!
//! ```text
//!   prepare(&self, call) ──▶ Prepared { effect, commit } ──▶ commit(&mut self, ..)
//!        (may fail, pure)                                     (infallible)
//! ```
//!
//! `prepare` performs every check and computes the outcome without mutating
//! anything. The engine then validates the payouts against the ledger, and
//! only if the whole settlement is valid calls `commit`. A failure anywhere
//! therefore leaves the operator, the ledger and the nonce set untouched.

use std::any::Any;

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Everything an operator learns about one settled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorCall {
    /// The paying account (the buyer / bidder).
    pub account: Address,
    /// Which operator entry point is being invoked.
    pub selector: FixedBytes<4>,
    /// Opaque call data covered by the account's action signature.
    pub data: Bytes,
    /// Sequencer-attested payload; trusted because the attestation verified.
    pub attestation_data: Bytes,
    /// Amount debited from `account` and handed to the operator.
    pub value: U256,
    /// Current unix time.
    pub now: u64,
}

/// A credit to apply to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: Address,
    pub amount: U256,
}

/// An NFT side effect produced by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NftEffect {
    /// An existing token changed hands.
    Transferred {
        nft_contract: Address,
        token_id: U256,
        from: Address,
        to: Address,
    },
    /// `quantity` units of a token were minted to `to`.
    Minted {
        nft_contract: Address,
        token_id: U256,
        to: Address,
        quantity: U256,
    },
}

/// The externally visible outcome of an operator call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// Ledger credits. Their sum never exceeds the call value; any
    /// remainder is refunded to the paying account.
    pub payouts: Vec<Payout>,
    pub nft_effects: Vec<NftEffect>,
}

impl Effect {
    /// Sum of all payouts, or `None` on overflow.
    #[must_use]
    pub fn total_payout(&self) -> Option<U256> {
        self.payouts
            .iter()
            .try_fold(U256::ZERO, |acc, p| acc.checked_add(p.amount))
    }
}

/// A validated operator outcome awaiting commit.
pub struct Prepared {
    pub effect: Effect,
    commit: Box<dyn Any + Send>,
}

impl Prepared {
    /// Pair an effect with the operator-private state change that realises it.
    pub fn new(effect: Effect, commit: impl Any + Send) -> Self {
        Self {
            effect,
            commit: Box::new(commit),
        }
    }

    /// Recover the operator-private commit data.
    pub fn into_commit<T: Any>(self) -> Option<T> {
        self.commit.downcast::<T>().ok().map(|b| *b)
    }
}

impl std::fmt::Debug for Prepared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prepared")
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}

/// A settlement operator.
pub trait Operator: Send {
    /// The operator's address (its registry key and EIP-712 verifying contract).
    fn address(&self) -> Address;

    /// Short name for logs.
    fn kind(&self) -> &'static str;

    /// Check the call and compute its outcome without mutating state.
    fn prepare(&self, call: &OperatorCall) -> Result<Prepared>;

    /// Apply a previously prepared outcome. Must not fail.
    ///
    /// Only the settlement engine calls this, after the payouts of
    /// `prepared` have been applied to the ledger.
    fn commit(&mut self, prepared: Prepared);

    /// Whether `caller` may collect the fees accrued to this operator.
    fn may_collect_fees(&self, caller: Address) -> bool;

    /// Concrete-type access for seller and owner entry points.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_payout_sums_and_detects_overflow() {
        let effect = Effect {
            payouts: vec![
                Payout {
                    to: Address::repeat_byte(1),
                    amount: U256::from(3),
                },
                Payout {
                    to: Address::repeat_byte(2),
                    amount: U256::from(4),
                },
            ],
            nft_effects: vec![],
        };
        assert_eq!(effect.total_payout(), Some(U256::from(7)));

        let overflow = Effect {
            payouts: vec![
                Payout {
                    to: Address::ZERO,
                    amount: U256::MAX,
                },
                Payout {
                    to: Address::ZERO,
                    amount: U256::from(1),
                },
            ],
            nft_effects: vec![],
        };
        assert_eq!(overflow.total_payout(), None);
    }

    #[test]
    fn prepared_commit_downcasts() {
        let prepared = Prepared::new(Effect::default(), 42u32);
        assert_eq!(prepared.into_commit::<u32>(), Some(42));
        let prepared = Prepared::new(Effect::default(), 42u32);
        assert_eq!(prepared.into_commit::<u64>(), None);
    }
}

//! Action settlement engine.
//!
//! Settles one attested operator call atomically:
//!
//! ```text
//!   1. Action signature (account; skipped when the account calls itself)
//!   2. ActionAttestation signature (sequencer), callHash recomputed
//!   3. amount <= maxAmount
//!   4. deadline not passed
//!   5. (account, nonce) unused
//!   6. operator.prepare(call)           ── payouts computed, nothing written
//!   7. batch = sweeps + value in, amount out, payouts + refund in
//!   8. ledger.apply(batch)              ── first write, all or nothing
//!   9. replay.consume + operator.commit ── cannot fail
//! ```
//!
//! Legacy auction settlement skips steps 1-5: the auction operator verifies
//! the bidder's `Bid` and the sequencer's `BidWinner` itself, and an auction
//! settles only once. Direct calls skip them too: the caller pays for its own
//! call and the operator enforces the price.

use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256};
use sealedpool_ledger::{EscrowLedger, LedgerBatch, ReplayGuard, SealedFundingFactory, SweepPlan};
use sealedpool_operators::abi::{self, SignedBid, SignedBidWinner, settleAuctionLegacyCall};
use sealedpool_types::{
    ActionEnvelope, Effect, OperatorCall, Result, SealedPoolError, SignatureVerifier,
    SignedActionAttestation, TypedDomain, call_hash, ensure_not_expired,
};
use serde::{Deserialize, Serialize};

use crate::registry::OperatorRegistry;

/// An attested action submitted by `caller`.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    pub caller: Address,
    pub envelope: &'a ActionEnvelope,
    pub attestation: &'a SignedActionAttestation,
    /// Value sent along with the call, credited to the account before the debit.
    pub value: U256,
}

/// An auction settled from a bidder-signed `Bid` and a sequencer-signed
/// `BidWinner` instead of an action envelope.
#[derive(Debug, Clone, Copy)]
pub struct LegacyAuctionRequest<'a> {
    pub caller: Address,
    pub operator: Address,
    pub bid: &'a SignedBid,
    pub winner: &'a SignedBidWinner,
    /// Value sent along with the call, credited to the winner before the debit.
    pub value: U256,
}

/// An operator call paid for by its own caller, with no sequencer
/// attestation.
#[derive(Debug, Clone)]
pub struct DirectRequest {
    pub caller: Address,
    pub operator: Address,
    pub selector: FixedBytes<4>,
    /// Call arguments without the selector.
    pub data: Bytes,
    /// Debited from the caller and handed to the operator as the call value.
    pub amount: U256,
    /// Value sent along with the call, credited to the caller before the debit.
    pub value: U256,
}

/// A committed settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// The account that paid.
    pub account: Address,
    pub operator: Address,
    /// Call hash for actions and direct calls, auction id for legacy settlements.
    pub reference: B256,
    /// Debited from the account.
    pub amount: U256,
    /// Part of `amount` the operator did not pay out, credited back.
    pub refund: U256,
    /// Value swept from sealed funding addresses in the same batch.
    pub swept: U256,
    pub effect: Effect,
}

struct Charge {
    operator: Address,
    reference: B256,
    /// `call.account` pays `call.value`.
    call: OperatorCall,
    attached: U256,
    /// `(nonce, deadline)` consumed on success.
    nonce: Option<(U256, U256)>,
}

/// Owns the ledger, the replay guard and the operator registry, and moves
/// value between them.
#[derive(Debug)]
pub struct SettlementEngine {
    verifier: SignatureVerifier,
    sequencer: Address,
    ledger: EscrowLedger,
    replay: ReplayGuard,
    operators: OperatorRegistry,
}

impl SettlementEngine {
    /// Engine verifying under `domain` with attestations from `sequencer`.
    #[must_use]
    pub fn new(domain: TypedDomain, sequencer: Address) -> Self {
        Self {
            verifier: SignatureVerifier::new(domain),
            sequencer,
            ledger: EscrowLedger::new(),
            replay: ReplayGuard::new(),
            operators: OperatorRegistry::new(),
        }
    }

    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn sequencer(&self) -> Address {
        self.sequencer
    }

    #[must_use]
    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut EscrowLedger {
        &mut self.ledger
    }

    #[must_use]
    pub fn replay(&self) -> &ReplayGuard {
        &self.replay
    }

    pub fn replay_mut(&mut self) -> &mut ReplayGuard {
        &mut self.replay
    }

    #[must_use]
    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn operators_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.operators
    }

    /// Signature, call hash, cap, deadline and nonce checks of an action.
    ///
    /// # Errors
    /// - `InvalidSignature` if either signature fails
    /// - `CallHashMismatch` if the attestation covers a different call
    /// - `AmountExceedsMax` if the attested amount is above the account's cap
    /// - `Expired` past the attestation deadline
    /// - `Replayed` if the nonce was already used
    pub fn verify_action(&self, request: &ActionRequest<'_>, now: u64) -> Result<()> {
        let ActionRequest {
            caller,
            envelope,
            attestation,
            ..
        } = *request;
        let account = attestation.account;

        if caller != account {
            self.verifier
                .verify(&envelope.typed(), &envelope.signature, account)?;
        }
        self.verifier
            .verify(&attestation.typed(), &attestation.signature, self.sequencer)?;
        if attestation.call_hash != envelope.call_hash() {
            return Err(SealedPoolError::CallHashMismatch);
        }
        if attestation.amount > envelope.max_amount {
            return Err(SealedPoolError::AmountExceedsMax {
                amount: attestation.amount,
                max_amount: envelope.max_amount,
            });
        }
        ensure_not_expired(attestation.deadline, now)?;
        self.replay.check(account, attestation.nonce)
    }

    /// Verify and settle an action, sweeping `sweeps` into the ledger in the
    /// same batch.
    pub fn settle(
        &mut self,
        request: &ActionRequest<'_>,
        sweeps: &[SweepPlan],
        now: u64,
    ) -> Result<Settlement> {
        self.verify_action(request, now)?;
        let envelope = request.envelope;
        let attestation = request.attestation;
        let charge = Charge {
            operator: envelope.operator,
            reference: attestation.call_hash,
            call: OperatorCall {
                account: attestation.account,
                selector: envelope.selector,
                data: envelope.data.clone(),
                attestation_data: attestation.attestation_data.clone(),
                value: attestation.amount,
                now,
            },
            attached: request.value,
            nonce: Some((attestation.nonce, attestation.deadline)),
        };
        let settlement = self.charge(charge, sweeps)?;
        tracing::info!(
            account = %settlement.account,
            caller = %request.caller,
            operator = %settlement.operator,
            nonce = %attestation.nonce,
            amount = %settlement.amount,
            refund = %settlement.refund,
            swept = %settlement.swept,
            "action settled"
        );
        Ok(settlement)
    }

    /// Settle an auction from a signed bid and a signed winner.
    pub fn settle_legacy(
        &mut self,
        request: &LegacyAuctionRequest<'_>,
        sweeps: &[SweepPlan],
        now: u64,
    ) -> Result<Settlement> {
        let call = settleAuctionLegacyCall {
            bid: request.bid.clone(),
            winner: request.winner.clone(),
        };
        let charge = Charge {
            operator: request.operator,
            reference: request.winner.auctionId,
            call: OperatorCall {
                account: request.winner.winner,
                selector: abi::selector::<settleAuctionLegacyCall>(),
                data: abi::encode_args(&call),
                attestation_data: Bytes::new(),
                value: request.winner.amount,
                now,
            },
            attached: request.value,
            nonce: None,
        };
        let settlement = self.charge(charge, sweeps)?;
        tracing::info!(
            auction_id = %settlement.reference,
            winner = %settlement.account,
            caller = %request.caller,
            operator = %settlement.operator,
            amount = %settlement.amount,
            "auction settled"
        );
        Ok(settlement)
    }

    /// Settle a call the caller pays for directly.
    pub fn settle_direct(&mut self, request: &DirectRequest, now: u64) -> Result<Settlement> {
        let charge = Charge {
            operator: request.operator,
            reference: call_hash(request.operator, &request.data),
            call: OperatorCall {
                account: request.caller,
                selector: request.selector,
                data: request.data.clone(),
                attestation_data: Bytes::new(),
                value: request.amount,
                now,
            },
            attached: request.value,
            nonce: None,
        };
        let settlement = self.charge(charge, &[])?;
        tracing::info!(
            account = %settlement.account,
            operator = %settlement.operator,
            amount = %settlement.amount,
            attached = %request.value,
            "direct call settled"
        );
        Ok(settlement)
    }

    fn charge(&mut self, charge: Charge, sweeps: &[SweepPlan]) -> Result<Settlement> {
        let Charge {
            operator,
            reference,
            call,
            attached,
            nonce,
        } = charge;
        let account = call.account;
        let amount = call.value;

        if let Some((nonce, _)) = nonce {
            self.replay.check(account, nonce)?;
        }
        let op = self.operators.get_mut(operator)?;
        let prepared = op.prepare(&call)?;

        let paid = prepared
            .effect
            .total_payout()
            .ok_or(SealedPoolError::ArithmeticOverflow)?;
        if paid > amount {
            return Err(SealedPoolError::PayoutsExceedAmount {
                payouts: paid,
                amount,
            });
        }
        let refund = amount - paid;
        let swept = sweeps
            .iter()
            .try_fold(U256::ZERO, |acc, p| acc.checked_add(p.amount))
            .ok_or(SealedPoolError::BalanceOverflow)?;

        let mut batch = LedgerBatch::new();
        SealedFundingFactory::stage(sweeps, &mut batch);
        if !attached.is_zero() {
            batch.deposit(account, attached);
        }
        batch.debit(account, amount);
        for payout in &prepared.effect.payouts {
            batch.credit(payout.to, payout.amount);
        }
        if !refund.is_zero() {
            batch.credit(account, refund);
        }

        self.ledger.apply(&batch)?;
        if let Some((nonce, deadline)) = nonce {
            self.replay.consume(account, nonce, deadline)?;
        }
        let effect = prepared.effect.clone();
        tracing::debug!(
            operator = %operator,
            kind = op.kind(),
            payouts = effect.payouts.len(),
            nft_effects = effect.nft_effects.len(),
            "operator commit"
        );
        op.commit(prepared);

        Ok(Settlement {
            account,
            operator,
            reference,
            amount,
            refund,
            swept,
            effect,
        })
    }
}

//! The pool: every entry point a user, seller or operator owner calls.
//!
//! `SealedPool` is the single writer over the ledger, nonces, pending
//! withdrawals, sealed funding and operators. Each method validates fully
//! before its first write, so a failed call changes nothing. Every committed
//! transition appends a [`Receipt`](sealedpool_types::Receipt) to the
//! journal.
//!
//! ```text
//!   deposit ─────────────────────────────▶ Balance(n + a)
//!   withdraw(sequencer-signed) ──────────▶ Balance(n − a), nonce consumed
//!   start_withdrawal ──▶ PENDING ──(delay)──▶ execute_pending_withdrawal
//!   fund_sealed_address ──▶ held ──deploy / settle_with_sealed_bids──▶ Balance
//!   settle / settle_old ─────────────────▶ account debited, payouts credited
//!   mint_edition / mint_new_edition ─────▶ caller debited, payouts credited
//! ```
//!
//! Registered operators are never handed out mutably. Sellers and owners
//! reach them through the typed administration methods below, none of which
//! move value.

use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256, U256};
use sealedpool_ledger::{PendingWithdrawals, ReceiptJournal, SealedFundingFactory, SweepPlan};
use alloy_sol_types::SolCall;
use sealedpool_operators::abi::{
    self, EditionTerms, SignedBid, SignedBidWinner, SignedMintOfferAttestation, SignedSellOffer,
    mintCall, mintNewCall,
};
use sealedpool_operators::{
    Auctions, EditionRules, Editions, MintAuctions, OfferSigner, OperatorRoles,
};
use sealedpool_types::{
    ActionEnvelope, Clock, Operator, PoolConfig, ReceiptKind, Result, SealedPoolError,
    SignedActionAttestation, SignedWithdrawal, SystemClock, WithdrawalHandle, WithdrawalKey,
    ensure_not_expired,
};

use crate::engine::{
    ActionRequest, DirectRequest, LegacyAuctionRequest, Settlement, SettlementEngine,
};

/// A pool behind one lock; verification and mutation happen under it.
pub type SharedPool = Arc<Mutex<SealedPool>>;

fn nonce_ref(nonce: U256) -> B256 {
    B256::from(nonce.to_be_bytes::<32>())
}

/// Escrow ledger plus attested settlement.
pub struct SealedPool {
    config: PoolConfig,
    clock: Arc<dyn Clock>,
    engine: SettlementEngine,
    pending: PendingWithdrawals,
    factory: SealedFundingFactory,
    journal: ReceiptJournal,
}

impl std::fmt::Debug for SealedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedPool")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("pending", &self.pending.len())
            .field("receipts", &self.journal.len())
            .finish_non_exhaustive()
    }
}

impl SealedPool {
    /// Create a pool from a validated config.
    ///
    /// # Errors
    /// Any error from [`PoolConfig::validate`].
    pub fn new(config: PoolConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let engine = SettlementEngine::new(config.domain(), config.sequencer);
        let factory = SealedFundingFactory::new(config.funding_factory, config.pool_address);
        tracing::info!(
            pool = %config.pool_address,
            sequencer = %config.sequencer,
            factory = %config.funding_factory,
            chain_id = config.chain_id,
            withdrawal_delay_secs = config.withdrawal_delay_secs,
            "sealed pool initialised"
        );
        Ok(Self {
            pending: PendingWithdrawals::new(config.withdrawal_delay_secs),
            config,
            clock,
            engine,
            factory,
            journal: ReceiptJournal::new(),
        })
    }

    /// Pool on wall-clock time.
    pub fn with_system_clock(config: PoolConfig) -> Result<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Wrap the pool for use from several threads.
    #[must_use]
    pub fn into_shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Balances
    // ------------------------------------------------------------------

    /// Credit `to` with `amount`. Anyone may deposit for anyone.
    /// Returns the new balance.
    pub fn deposit(&mut self, to: Address, amount: U256) -> Result<U256> {
        let balance = self.engine.ledger_mut().deposit(to, amount)?;
        let now = self.now();
        self.journal.append(ReceiptKind::Deposit, to, amount, None, now);
        tracing::info!(account = %to, amount = %amount, balance = %balance, "deposit");
        Ok(balance)
    }

    /// Withdraw immediately with a sequencer-signed `VerifyWithdrawal`.
    /// Returns the amount paid out.
    ///
    /// # Errors
    /// - `InvalidSignature` if the sequencer did not sign it
    /// - `NotSender` if `caller` is not the withdrawing account
    /// - `Expired` past the deadline
    /// - `Replayed` if the nonce was already used
    /// - `InsufficientBalance` if the account cannot cover it
    pub fn withdraw(&mut self, caller: Address, withdrawal: &SignedWithdrawal) -> Result<U256> {
        let now = self.now();
        let account = withdrawal.account;
        self.engine.verifier().verify(
            &withdrawal.typed(),
            &withdrawal.signature,
            self.engine.sequencer(),
        )?;
        if caller != account {
            return Err(SealedPoolError::NotSender { caller, account });
        }
        ensure_not_expired(withdrawal.deadline, now)?;
        self.engine.replay().check(account, withdrawal.nonce)?;

        self.engine.ledger_mut().withdraw(account, withdrawal.amount)?;
        self.engine
            .replay_mut()
            .consume(account, withdrawal.nonce, withdrawal.deadline)?;
        self.journal.append(
            ReceiptKind::Withdrawal,
            account,
            withdrawal.amount,
            Some(nonce_ref(withdrawal.nonce)),
            now,
        );
        tracing::info!(
            account = %account,
            amount = %withdrawal.amount,
            nonce = %withdrawal.nonce,
            "signed withdrawal"
        );
        Ok(withdrawal.amount)
    }

    /// Begin a withdrawal that needs no sequencer signature but only
    /// executes after the configured delay. Nothing is debited yet.
    pub fn start_withdrawal(
        &mut self,
        caller: Address,
        amount: U256,
        nonce: U256,
    ) -> Result<WithdrawalHandle> {
        let now = self.now();
        let handle = self.pending.start(caller, amount, nonce, now)?;
        self.journal.append(
            ReceiptKind::WithdrawalStarted,
            caller,
            amount,
            Some(nonce_ref(nonce)),
            now,
        );
        tracing::info!(
            account = %caller,
            amount = %amount,
            nonce = %nonce,
            start_time = now,
            executable_after = handle.executable_after,
            "withdrawal started"
        );
        Ok(handle)
    }

    /// Pay out a started withdrawal of `caller`. An unknown or already
    /// executed handle pays zero and leaves no receipt.
    ///
    /// # Errors
    /// - `TooSoon` until the delay has fully elapsed
    /// - `InsufficientBalance` if the balance no longer covers the amount
    pub fn execute_pending_withdrawal(
        &mut self,
        caller: Address,
        start_time: u64,
        nonce: U256,
    ) -> Result<U256> {
        let now = self.now();
        let key = WithdrawalKey {
            account: caller,
            start_time,
            nonce,
        };
        let amount = self.pending.ready_amount(&key, now)?;
        if amount.is_zero() {
            self.pending.take_ready(&key, now)?;
            tracing::debug!(account = %caller, nonce = %nonce, start_time, "nothing pending");
            return Ok(U256::ZERO);
        }
        self.engine.ledger_mut().withdraw(caller, amount)?;
        self.pending.take_ready(&key, now)?;
        self.journal.append(
            ReceiptKind::WithdrawalExecuted,
            caller,
            amount,
            Some(nonce_ref(nonce)),
            now,
        );
        tracing::info!(
            account = %caller,
            amount = %amount,
            nonce = %nonce,
            start_time,
            "withdrawal executed"
        );
        Ok(amount)
    }

    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.engine.ledger().balance_of(account)
    }

    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.engine.ledger().total_supply()
    }

    /// Check that balances equal deposits minus withdrawals.
    pub fn verify_supply(&self) -> Result<()> {
        self.engine.ledger().verify_supply()
    }

    #[must_use]
    pub fn is_nonce_used(&self, account: Address, nonce: U256) -> bool {
        self.engine.replay().is_consumed(account, nonce)
    }

    /// Forget nonces whose attestations have expired.
    pub fn prune_nonces(&mut self) -> usize {
        let now = self.now();
        let pruned = self.engine.replay_mut().prune_expired(now);
        tracing::debug!(pruned, "expired nonces pruned");
        pruned
    }

    #[must_use]
    pub fn pending_withdrawals(&self) -> &PendingWithdrawals {
        &self.pending
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Settle an attested operator call.
    pub fn settle(
        &mut self,
        caller: Address,
        envelope: &ActionEnvelope,
        attestation: &SignedActionAttestation,
        value: U256,
    ) -> Result<Settlement> {
        self.settle_with_sealed_bids(caller, &[], envelope, attestation, value)
    }

    /// Sweep the account's undeployed sealed fundings for `salts` and settle,
    /// in one atomic step. Already deployed salts are skipped.
    pub fn settle_with_sealed_bids(
        &mut self,
        caller: Address,
        salts: &[B256],
        envelope: &ActionEnvelope,
        attestation: &SignedActionAttestation,
        value: U256,
    ) -> Result<Settlement> {
        let now = self.now();
        let sweeps = self.factory.plan_sweeps(salts, attestation.account);
        let request = ActionRequest {
            caller,
            envelope,
            attestation,
            value,
        };
        let settlement = self.engine.settle(&request, &sweeps, now)?;
        self.finish_sweeps(&sweeps, now);
        self.journal.append(
            ReceiptKind::ActionSettled,
            settlement.account,
            settlement.amount,
            Some(settlement.reference),
            now,
        );
        Ok(settlement)
    }

    /// Sweep the winner's sealed fundings and settle an auction from a
    /// bidder-signed `Bid` and a sequencer-signed `BidWinner`.
    pub fn settle_old(
        &mut self,
        caller: Address,
        salts: &[B256],
        operator: Address,
        bid: &SignedBid,
        winner: &SignedBidWinner,
        value: U256,
    ) -> Result<Settlement> {
        let now = self.now();
        let sweeps = self.factory.plan_sweeps(salts, winner.winner);
        let request = LegacyAuctionRequest {
            caller,
            operator,
            bid,
            winner,
            value,
        };
        let settlement = self.engine.settle_legacy(&request, &sweeps, now)?;
        self.finish_sweeps(&sweeps, now);
        self.journal.append(
            ReceiptKind::AuctionSettled,
            settlement.account,
            settlement.amount,
            Some(settlement.reference),
            now,
        );
        Ok(settlement)
    }

    fn finish_sweeps(&mut self, sweeps: &[SweepPlan], now: u64) {
        for plan in sweeps {
            self.factory.commit_sweep(plan);
            self.journal.append(
                ReceiptKind::SealedFundingSwept,
                plan.depositor,
                plan.amount,
                Some(plan.salt),
                now,
            );
        }
    }

    // ------------------------------------------------------------------
    // Sealed funding
    // ------------------------------------------------------------------

    /// Address a depositor funds to commit to a sealed bid.
    #[must_use]
    pub fn compute_sealed_funding_address(&self, salt: B256, depositor: Address) -> Address {
        self.factory.compute_address(salt, depositor)
    }

    /// Send value to a sealed funding address. Returns what it now holds.
    ///
    /// # Errors
    /// `SealedFundingDeployed` once the address has been swept.
    pub fn fund_sealed_address(&mut self, address: Address, amount: U256) -> Result<U256> {
        self.factory.fund(address, amount)
    }

    /// Sweep one sealed funding address into the depositor's balance.
    /// Returns the amount swept.
    pub fn deploy_sealed_funding(&mut self, salt: B256, depositor: Address) -> Result<U256> {
        let now = self.now();
        let plan = self.factory.deploy(salt, depositor, self.engine.ledger_mut())?;
        self.journal.append(
            ReceiptKind::SealedFundingSwept,
            depositor,
            plan.amount,
            Some(salt),
            now,
        );
        Ok(plan.amount)
    }

    #[must_use]
    pub fn sealed_funding(&self) -> &SealedFundingFactory {
        &self.factory
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    /// Make `operator` reachable from actions.
    pub fn register_operator(&mut self, operator: Box<dyn Operator>) -> Result<Address> {
        self.engine.operators_mut().register(operator)
    }

    /// A registered operator as its concrete type.
    pub fn operator<T: Operator + 'static>(&self, address: Address) -> Result<&T> {
        self.engine.operators().downcast(address)
    }

    fn operator_mut<T: Operator + 'static>(&mut self, address: Address) -> Result<&mut T> {
        self.engine.operators_mut().downcast_mut(address)
    }

    /// Pay out the fees accrued to `operator`'s ledger account.
    /// Returns the amount collected.
    ///
    /// # Errors
    /// `Unauthorized` unless the operator lets `caller` collect.
    pub fn collect_operator_fees(&mut self, caller: Address, operator: Address) -> Result<U256> {
        if !self.engine.operators().get(operator)?.may_collect_fees(caller) {
            return Err(SealedPoolError::unauthorized("caller may not collect operator fees"));
        }
        let amount = self.balance_of(operator);
        if !amount.is_zero() {
            self.engine.ledger_mut().withdraw(operator, amount)?;
        }
        let now = self.now();
        self.journal.append(ReceiptKind::FeesCollected, operator, amount, None, now);
        tracing::info!(operator = %operator, caller = %caller, amount = %amount, "fees collected");
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Editions
    // ------------------------------------------------------------------

    /// Buy `quantity` more copies of an existing edition. The price,
    /// `cost * quantity`, is debited from the caller after `value` is
    /// credited to it, and split between the seller and the operator.
    ///
    /// # Errors
    /// - `ArithmeticOverflow` if the price does not fit
    /// - any rejection of the edition (limits, dates, allowlist)
    /// - `InsufficientBalance` if the caller cannot cover the price
    pub fn mint_edition(
        &mut self,
        caller: Address,
        operator: Address,
        terms: &EditionTerms,
        quantity: U256,
        proof: Vec<B256>,
        value: U256,
    ) -> Result<Settlement> {
        let amount = price(terms.cost, quantity)?;
        let call = mintCall {
            quantity,
            terms: terms.clone(),
            proof,
        };
        self.settle_direct(caller, operator, &call, amount, value)
    }

    /// Create the edition a seller offered (or buy from it if it already
    /// exists), paying `cost * quantity` the same way as [`Self::mint_edition`].
    #[allow(clippy::too_many_arguments)]
    pub fn mint_new_edition(
        &mut self,
        caller: Address,
        operator: Address,
        offer: &SignedSellOffer,
        attestation: &SignedMintOfferAttestation,
        quantity: U256,
        proof: Vec<B256>,
        value: U256,
    ) -> Result<Settlement> {
        let amount = price(offer.cost, quantity)?;
        let call = mintNewCall {
            offer: offer.clone(),
            attestation: attestation.clone(),
            quantity,
            proof,
        };
        self.settle_direct(caller, operator, &call, amount, value)
    }

    fn settle_direct<C: SolCall>(
        &mut self,
        caller: Address,
        operator: Address,
        call: &C,
        amount: U256,
        value: U256,
    ) -> Result<Settlement> {
        let now = self.now();
        let request = DirectRequest {
            caller,
            operator,
            selector: abi::selector::<C>(),
            data: abi::encode_args(call),
            amount,
            value,
        };
        let settlement = self.engine.settle_direct(&request, now)?;
        self.journal.append(
            ReceiptKind::ActionSettled,
            settlement.account,
            settlement.amount,
            Some(settlement.reference),
            now,
        );
        Ok(settlement)
    }

    /// Close an edition for good. Seller only.
    pub fn stop_mint(
        &mut self,
        caller: Address,
        operator: Address,
        terms: &EditionTerms,
    ) -> Result<()> {
        self.operator_mut::<Editions>(operator)?.stop_mint(caller, terms)
    }

    /// Replace an edition's rules. Seller or a seller delegate only.
    pub fn set_edition_rules(
        &mut self,
        caller: Address,
        operator: Address,
        terms: &EditionTerms,
        rules: EditionRules,
    ) -> Result<()> {
        self.operator_mut::<Editions>(operator)?.set_rules(caller, terms, rules)
    }

    // ------------------------------------------------------------------
    // Auctions and offers
    // ------------------------------------------------------------------

    /// Put `seller`'s token up for auction on `operator`. Returns the auction id.
    pub fn create_auction(
        &mut self,
        operator: Address,
        seller: Address,
        nft_contract: Address,
        auction_type: B256,
        token_id: U256,
        reserve: U256,
    ) -> Result<B256> {
        self.operator_mut::<Auctions>(operator)?.create_auction(
            seller,
            nft_contract,
            auction_type,
            token_id,
            reserve,
        )
    }

    pub fn cancel_auction(
        &mut self,
        caller: Address,
        operator: Address,
        auction_id: B256,
    ) -> Result<()> {
        self.operator_mut::<Auctions>(operator)?.cancel_auction(caller, auction_id)
    }

    /// Invalidate every unused offer `caller` signed on `operator` with its
    /// current counter. Returns the new counter.
    ///
    /// # Errors
    /// `Configuration` unless `operator` is a mint auction or edition operator.
    pub fn increase_counter(&mut self, caller: Address, operator: Address) -> Result<U256> {
        let op = self.engine.operators_mut().get_mut(operator)?;
        let kind = op.kind();
        let any = op.as_any_mut();
        if let Some(mints) = any.downcast_mut::<MintAuctions>() {
            return mints.increase_counter(caller);
        }
        match any.downcast_mut::<Editions>() {
            Some(editions) => editions.increase_counter(caller),
            None => Err(keeps_no_offers(operator, kind)),
        }
    }

    /// Invalidate one unused offer nonce `caller` signed on `operator`.
    pub fn cancel_offer(&mut self, caller: Address, operator: Address, nonce: U256) -> Result<()> {
        let op = self.engine.operators_mut().get_mut(operator)?;
        let kind = op.kind();
        let any = op.as_any_mut();
        if let Some(mints) = any.downcast_mut::<MintAuctions>() {
            return mints.cancel_offer(caller, nonce);
        }
        match any.downcast_mut::<Editions>() {
            Some(editions) => editions.cancel_offer(caller, nonce),
            None => Err(keeps_no_offers(operator, kind)),
        }
    }

    /// Choose who signs mint auction offers. Owner only.
    pub fn set_offer_signer(
        &mut self,
        caller: Address,
        operator: Address,
        role: OfferSigner,
    ) -> Result<()> {
        self.operator_mut::<MintAuctions>(operator)?.set_signer_role(caller, role)
    }

    // ------------------------------------------------------------------
    // Operator roles
    // ------------------------------------------------------------------

    /// Change an operator's protocol fee. Owner only.
    pub fn set_protocol_fee(
        &mut self,
        caller: Address,
        operator: Address,
        fee_bps: u64,
    ) -> Result<()> {
        self.roles_mut(operator)?.set_protocol_fee(caller, fee_bps)
    }

    /// Change the sequencer an operator trusts. Owner only.
    pub fn set_operator_sequencer(
        &mut self,
        caller: Address,
        operator: Address,
        sequencer: Address,
    ) -> Result<()> {
        self.roles_mut(operator)?.set_sequencer(caller, sequencer)
    }

    pub fn transfer_operator_ownership(
        &mut self,
        caller: Address,
        operator: Address,
        new_owner: Address,
    ) -> Result<()> {
        self.roles_mut(operator)?.transfer_ownership(caller, new_owner)
    }

    fn roles_mut(&mut self, operator: Address) -> Result<&mut OperatorRoles> {
        let op = self.engine.operators_mut().get_mut(operator)?;
        let kind = op.kind();
        let any = op.as_any_mut();
        let roles = if any.is::<Auctions>() {
            any.downcast_mut::<Auctions>().map(Auctions::roles_mut)
        } else if any.is::<MintAuctions>() {
            any.downcast_mut::<MintAuctions>().map(MintAuctions::roles_mut)
        } else {
            any.downcast_mut::<Editions>().map(Editions::roles_mut)
        };
        roles.ok_or_else(|| {
            SealedPoolError::Configuration(format!("operator {operator} ({kind}) has no roles"))
        })
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    #[must_use]
    pub fn receipts(&self) -> &ReceiptJournal {
        &self.journal
    }
}

fn price(cost: U256, quantity: U256) -> Result<U256> {
    cost.checked_mul(quantity).ok_or(SealedPoolError::ArithmeticOverflow)
}

fn keeps_no_offers(operator: Address, kind: &str) -> SealedPoolError {
    SealedPoolError::Configuration(format!("operator {operator} ({kind}) keeps no offers"))
}

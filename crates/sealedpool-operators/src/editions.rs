//! Open editions minted at a fixed price.
//!
//! An edition is created by the first `mint_new` that presents a
//! seller-signed `SellOffer` together with a sequencer-signed
//! `MintOfferAttestation` naming the buyer. From then on anyone may `mint`
//! more copies by quoting the edition's terms, until `maxToMint` is reached,
//! the end date passes, or the seller stops the mint.
//!
//! ```text
//!   mint_new(offer) ──▶ edition created (token id assigned), quantity minted
//!   mint_new(offer) again ──▶ treated as mint(terms)
//!   mint(terms):
//!       unknown / minted + q > maxToMint   ──▶ ">maxToMint"
//!       value != cost * q                  ──▶ ValueMismatch
//!       stopped (minted = MAX)             ──▶ ArithmeticOverflow
//! ```
//!
//! Sellers (or their delegates) may additionally gate an edition with a
//! start date, a per-wallet cap and a Merkle allowlist.
//!
//! Unused offers are revoked one at a time with `cancel_offer` or all at
//! once with `increase_counter`. Neither closes an edition that already
//! exists; that is what `stop_mint` is for.
//!
//! Purchases are only reachable through [`Operator::prepare`] and
//! [`Operator::commit`], so every copy is paid for through the pool's ledger.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use sealedpool_types::{
    Effect, NftEffect, Operator, OperatorCall, Prepared, Result, SealedPoolError, SellOffer,
    ensure_not_expired,
};
use serde::{Deserialize, Serialize};

use crate::abi::{
    self, EditionTerms, SignedMintOfferAttestation, SignedSellOffer, mintCall, mintNewCall,
};
use crate::delegate::{DelegateRegistry, acts_for};
use crate::merkle;
use crate::nft::NftLedger;
use crate::roles::OperatorRoles;

/// Per-buyer hash the sequencer attests to:
/// `keccak256(abi.encode(buyer, seller, nftContract, uri, cost, endDate,
/// maxToMint, deadline, counter, nonce))`.
#[must_use]
pub fn offer_hash(buyer: Address, seller: Address, offer: &SellOffer) -> B256 {
    keccak256(
        (
            buyer,
            seller,
            offer.nftContract,
            offer.uri.clone(),
            offer.cost,
            offer.endDate,
            offer.maxToMint,
            offer.deadline,
            offer.counter,
            offer.nonce,
        )
            .abi_encode_params(),
    )
}

/// Optional gates a seller can put on an edition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionRules {
    /// No mints before this unix time.
    pub start_date: u64,
    /// Copies one wallet may hold from this edition; zero means unlimited.
    pub max_per_wallet: U256,
    /// Merkle root of allowed buyers (`merkle::leaf(buyer)`).
    pub allowlist_root: Option<B256>,
}

#[derive(Debug, Clone, Default)]
struct Edition {
    minted: U256,
    rules: EditionRules,
}

/// One purchase of edition copies.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Purchase {
    buyer: Address,
    quantity: U256,
    /// Value paid; must equal `cost * quantity`.
    value: U256,
    /// Allowlist proof, empty when the edition has no allowlist.
    proof: Vec<B256>,
    now: u64,
}

/// The offer that creates an edition on commit.
#[derive(Debug)]
struct Creation {
    digest: B256,
    uri: String,
    nonce: U256,
}

#[derive(Debug)]
struct EditionCommit {
    terms: EditionTerms,
    created: Option<Creation>,
    minted_after: U256,
    buyer: Address,
    wallet_after: U256,
    quantity: U256,
}

/// The open-edition operator.
pub struct Editions {
    roles: OperatorRoles,
    delegates: Arc<dyn DelegateRegistry>,
    editions: HashMap<EditionTerms, Edition>,
    offers: HashMap<B256, EditionTerms>,
    used_nonces: HashSet<(Address, U256)>,
    wallet_mints: HashMap<(EditionTerms, Address), U256>,
    counters: HashMap<Address, U256>,
    nfts: NftLedger,
}

impl std::fmt::Debug for Editions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editions")
            .field("roles", &self.roles)
            .field("editions", &self.editions.len())
            .finish_non_exhaustive()
    }
}

impl Editions {
    pub fn new(roles: OperatorRoles, delegates: Arc<dyn DelegateRegistry>) -> Self {
        Self {
            roles,
            delegates,
            editions: HashMap::new(),
            offers: HashMap::new(),
            used_nonces: HashSet::new(),
            wallet_mints: HashMap::new(),
            counters: HashMap::new(),
            nfts: NftLedger::new(),
        }
    }

    #[must_use]
    pub fn roles(&self) -> &OperatorRoles {
        &self.roles
    }

    pub fn roles_mut(&mut self) -> &mut OperatorRoles {
        &mut self.roles
    }

    #[must_use]
    pub fn nfts(&self) -> &NftLedger {
        &self.nfts
    }

    pub fn nfts_mut(&mut self) -> &mut NftLedger {
        &mut self.nfts
    }

    /// Copies minted so far, `None` for an unknown edition.
    #[must_use]
    pub fn minted(&self, terms: &EditionTerms) -> Option<U256> {
        self.editions.get(terms).map(|e| e.minted)
    }

    #[must_use]
    pub fn rules(&self, terms: &EditionTerms) -> Option<&EditionRules> {
        self.editions.get(terms).map(|e| &e.rules)
    }

    /// Terms of the edition a previously used offer created.
    #[must_use]
    pub fn edition_for_offer(&self, offer: &SignedSellOffer) -> Option<&EditionTerms> {
        let digest = self.roles.verifier().digest(&offer.typed());
        self.offers.get(&digest)
    }

    #[must_use]
    pub fn counter(&self, seller: Address) -> U256 {
        self.counters.get(&seller).copied().unwrap_or_default()
    }

    /// Invalidate every unused offer `caller` signed with the current counter.
    pub fn increase_counter(&mut self, caller: Address) -> Result<U256> {
        let counter = self.counters.entry(caller).or_default();
        *counter = counter
            .checked_add(U256::from(1))
            .ok_or(SealedPoolError::ArithmeticOverflow)?;
        Ok(*counter)
    }

    /// Invalidate one unused offer nonce of `caller`.
    pub fn cancel_offer(&mut self, caller: Address, nonce: U256) -> Result<()> {
        if !self.used_nonces.insert((caller, nonce)) {
            return Err(SealedPoolError::Replayed {
                account: caller,
                nonce,
            });
        }
        tracing::info!(seller = %caller, nonce = %nonce, "sell offer cancelled");
        Ok(())
    }

    /// Whether `seller`'s offer `nonce` created an edition or was cancelled.
    #[must_use]
    pub fn is_offer_used(&self, seller: Address, nonce: U256) -> bool {
        self.used_nonces.contains(&(seller, nonce))
    }

    #[cfg(test)]
    fn mint_new(
        &mut self,
        offer: &SignedSellOffer,
        attestation: &SignedMintOfferAttestation,
        purchase: &Purchase,
    ) -> Result<Effect> {
        let prepared = self.prepare_mint_new(offer, attestation, purchase)?;
        let effect = prepared.effect.clone();
        self.commit(prepared);
        Ok(effect)
    }

    #[cfg(test)]
    fn mint(&mut self, terms: &EditionTerms, purchase: &Purchase) -> Result<Effect> {
        let prepared = self.prepare_purchase(terms.clone(), purchase, None)?;
        let effect = prepared.effect.clone();
        self.commit(prepared);
        Ok(effect)
    }

    /// Close an edition for good. Seller only.
    ///
    /// The minted counter is pinned at its maximum, so any later mint fails
    /// with `ArithmeticOverflow`.
    pub fn stop_mint(&mut self, caller: Address, terms: &EditionTerms) -> Result<()> {
        if caller != terms.seller {
            return Err(SealedPoolError::unauthorized("only the seller may stop a mint"));
        }
        let edition = self
            .editions
            .get_mut(terms)
            .ok_or_else(|| SealedPoolError::rejected("unknown edition"))?;
        edition.minted = U256::MAX;
        tracing::info!(nft = %terms.nftContract, token_id = %terms.tokenId, "edition stopped");
        Ok(())
    }

    /// Replace an edition's rules. Seller or a seller delegate only.
    pub fn set_rules(
        &mut self,
        caller: Address,
        terms: &EditionTerms,
        rules: EditionRules,
    ) -> Result<()> {
        if !acts_for(self.delegates.as_ref(), terms.seller, caller) {
            return Err(SealedPoolError::unauthorized(
                "only the seller or a delegate may edit rules",
            ));
        }
        let edition = self
            .editions
            .get_mut(terms)
            .ok_or_else(|| SealedPoolError::rejected("unknown edition"))?;
        tracing::info!(
            nft = %terms.nftContract,
            token_id = %terms.tokenId,
            start_date = rules.start_date,
            max_per_wallet = %rules.max_per_wallet,
            allowlist = rules.allowlist_root.is_some(),
            "edition rules updated"
        );
        edition.rules = rules;
        Ok(())
    }

    fn prepare_mint_new(
        &self,
        offer: &SignedSellOffer,
        attestation: &SignedMintOfferAttestation,
        purchase: &Purchase,
    ) -> Result<Prepared> {
        let sell = offer.typed();
        let verifier = self.roles.verifier();
        let seller = verifier.recover(&sell, &offer.signature())?;
        let digest = verifier.digest(&sell);

        if let Some(terms) = self.offers.get(&digest) {
            return self.prepare_purchase(terms.clone(), purchase, None);
        }

        if self.is_offer_used(seller, sell.nonce) {
            tracing::warn!(seller = %seller, nonce = %sell.nonce, "sell offer reused");
            return Err(SealedPoolError::Replayed {
                account: seller,
                nonce: sell.nonce,
            });
        }
        ensure_not_expired(sell.deadline, purchase.now)?;
        let current = self.counter(seller);
        if sell.counter < current {
            tracing::warn!(
                seller = %seller,
                offered = %sell.counter,
                current = %current,
                "stale sell offer"
            );
            return Err(SealedPoolError::StaleCounter {
                offered: sell.counter,
                current,
            });
        }

        let expected = offer_hash(purchase.buyer, seller, &sell);
        let stamp = attestation.typed();
        if stamp.offerHash != expected {
            return Err(SealedPoolError::rejected("attestation is for a different offer"));
        }
        verifier.verify(&stamp, &attestation.signature(), self.roles.sequencer())?;
        ensure_not_expired(stamp.deadline, purchase.now)?;

        let terms = EditionTerms {
            nftContract: sell.nftContract,
            tokenId: self.nfts.next_token_id(sell.nftContract),
            cost: sell.cost,
            endDate: sell.endDate,
            maxToMint: sell.maxToMint,
            seller,
        };
        let creation = Creation {
            digest,
            uri: sell.uri,
            nonce: sell.nonce,
        };
        self.prepare_purchase(terms, purchase, Some(creation))
    }

    fn prepare_purchase(
        &self,
        terms: EditionTerms,
        purchase: &Purchase,
        created: Option<Creation>,
    ) -> Result<Prepared> {
        let (minted, rules) = if created.is_some() {
            (U256::ZERO, EditionRules::default())
        } else {
            let edition = self
                .editions
                .get(&terms)
                .ok_or_else(|| SealedPoolError::limit(">maxToMint"))?;
            (edition.minted, edition.rules.clone())
        };

        let minted_after = minted
            .checked_add(purchase.quantity)
            .ok_or(SealedPoolError::ArithmeticOverflow)?;
        if minted_after > terms.maxToMint {
            return Err(SealedPoolError::limit(">maxToMint"));
        }
        let price = terms
            .cost
            .checked_mul(purchase.quantity)
            .ok_or(SealedPoolError::ArithmeticOverflow)?;
        if purchase.value != price {
            return Err(SealedPoolError::ValueMismatch {
                expected: price,
                actual: purchase.value,
            });
        }
        ensure_not_expired(terms.endDate, purchase.now)?;
        if purchase.now < rules.start_date {
            return Err(SealedPoolError::limit("<startDate"));
        }

        let held = self
            .wallet_mints
            .get(&(terms.clone(), purchase.buyer))
            .copied()
            .unwrap_or_default();
        let wallet_after = held
            .checked_add(purchase.quantity)
            .ok_or(SealedPoolError::ArithmeticOverflow)?;
        if !rules.max_per_wallet.is_zero() && wallet_after > rules.max_per_wallet {
            return Err(SealedPoolError::limit(">maxPerWallet"));
        }
        if let Some(root) = rules.allowlist_root {
            if !merkle::verify(&purchase.proof, root, merkle::leaf(purchase.buyer)) {
                return Err(SealedPoolError::BadProof);
            }
        }

        let effect = Effect {
            payouts: self.roles.split(terms.seller, purchase.value),
            nft_effects: vec![NftEffect::Minted {
                nft_contract: terms.nftContract,
                token_id: terms.tokenId,
                to: purchase.buyer,
                quantity: purchase.quantity,
            }],
        };
        Ok(Prepared::new(
            effect,
            EditionCommit {
                terms,
                created,
                minted_after,
                buyer: purchase.buyer,
                wallet_after,
                quantity: purchase.quantity,
            },
        ))
    }
}

impl Operator for Editions {
    fn address(&self) -> Address {
        self.roles.address()
    }

    fn kind(&self) -> &'static str {
        "editions"
    }

    fn prepare(&self, call: &OperatorCall) -> Result<Prepared> {
        if call.selector == abi::selector::<mintNewCall>() {
            let args: mintNewCall = abi::decode_args(&call.data)?;
            let purchase = Purchase {
                buyer: call.account,
                quantity: args.quantity,
                value: call.value,
                proof: args.proof,
                now: call.now,
            };
            self.prepare_mint_new(&args.offer, &args.attestation, &purchase)
        } else if call.selector == abi::selector::<mintCall>() {
            let args: mintCall = abi::decode_args(&call.data)?;
            let purchase = Purchase {
                buyer: call.account,
                quantity: args.quantity,
                value: call.value,
                proof: args.proof,
                now: call.now,
            };
            self.prepare_purchase(args.terms, &purchase, None)
        } else {
            Err(SealedPoolError::UnknownSelector {
                operator: self.address(),
                selector: alloy_primitives::hex::encode(call.selector),
            })
        }
    }

    fn commit(&mut self, prepared: Prepared) {
        let Some(c) = prepared.into_commit::<EditionCommit>() else {
            tracing::error!(operator = %self.address(), "foreign commit handed to editions");
            return;
        };
        let nft = c.terms.nftContract;
        let token_id = c.terms.tokenId;
        if let Some(creation) = &c.created {
            self.nfts.create_edition(nft, token_id, &creation.uri);
            self.offers.insert(creation.digest, c.terms.clone());
            self.used_nonces.insert((c.terms.seller, creation.nonce));
            tracing::info!(
                nft = %nft,
                token_id = %token_id,
                seller = %c.terms.seller,
                max_to_mint = %c.terms.maxToMint,
                "edition created"
            );
        }
        self.editions.entry(c.terms.clone()).or_default().minted = c.minted_after;
        self.wallet_mints
            .insert((c.terms, c.buyer), c.wallet_after);
        self.nfts.mint_edition(nft, token_id, c.buyer, c.quantity);
        tracing::info!(
            nft = %nft,
            token_id = %token_id,
            buyer = %c.buyer,
            quantity = %c.quantity,
            "edition minted"
        );
    }

    fn may_collect_fees(&self, caller: Address) -> bool {
        self.roles.is_owner(caller)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::{NoDelegates, StaticDelegates};
    use sealedpool_types::testing::{eth, eth_tenths};
    use sealedpool_types::{MintOfferAttestation, TestSigner};

    const NOW: u64 = 1_700_000_000;
    const URI: &str = "ipfs://w8esse";

    struct Fixture {
        editions: Editions,
        sequencer: TestSigner,
        seller: TestSigner,
        buyer: Address,
        nft: Address,
    }

    fn fixture(delegates: Arc<dyn DelegateRegistry>) -> Fixture {
        let sequencer = TestSigner::from_seed(1);
        let roles = OperatorRoles::new(
            Address::repeat_byte(0xed),
            sequencer.address(),
            sequencer.address(),
            31_337,
        )
        .unwrap();
        let nft = Address::repeat_byte(0xe2);
        let mut editions = Editions::new(roles, delegates);
        // The collection already holds tokens 1..=3.
        editions.nfts_mut().seed_next_id(nft, U256::from(4));
        Fixture {
            editions,
            sequencer,
            seller: TestSigner::from_seed(2),
            buyer: Address::repeat_byte(0xbb),
            nft,
        }
    }

    fn sell_offer(f: &Fixture) -> SellOffer {
        SellOffer {
            nftContract: f.nft,
            uri: URI.into(),
            cost: eth_tenths(1),
            endDate: U256::from(NOW + 600),
            maxToMint: U256::from(100),
            deadline: U256::from(NOW + 600),
            counter: U256::from(1),
            nonce: U256::from(1),
        }
    }

    fn signed(f: &Fixture, offer: &SellOffer) -> (SignedSellOffer, SignedMintOfferAttestation) {
        let domain = f.editions.roles().domain();
        let stamp = MintOfferAttestation {
            deadline: U256::from(NOW + 600),
            offerHash: offer_hash(f.buyer, f.seller.address(), offer),
        };
        (
            SignedSellOffer::from_parts(offer, f.seller.sign(offer, domain)),
            SignedMintOfferAttestation::from_parts(&stamp, f.sequencer.sign(&stamp, domain)),
        )
    }

    fn terms(f: &Fixture, token_id: u64) -> EditionTerms {
        EditionTerms {
            nftContract: f.nft,
            tokenId: U256::from(token_id),
            cost: eth_tenths(1),
            endDate: U256::from(NOW + 600),
            maxToMint: U256::from(100),
            seller: f.seller.address(),
        }
    }

    fn buy(f: &Fixture, quantity: u64, tenths: u64) -> Purchase {
        Purchase {
            buyer: f.buyer,
            quantity: U256::from(quantity),
            value: eth_tenths(tenths),
            proof: Vec::new(),
            now: NOW,
        }
    }

    #[test]
    fn basic_flow() {
        let mut f = fixture(Arc::new(NoDelegates));
        let offer = sell_offer(&f);
        let (signed_offer, attestation) = signed(&f, &offer);
        let nft_id = 4;

        let err = f.editions.mint(&terms(&f, nft_id), &buy(&f, 1, 1)).unwrap_err();
        assert!(matches!(err, SealedPoolError::LimitExceeded { limit } if limit == ">maxToMint"));
        assert_eq!(
            f.editions.nfts().balance_of(f.nft, U256::from(nft_id), f.buyer),
            U256::ZERO
        );

        let effect = f
            .editions
            .mint_new(&signed_offer, &attestation, &buy(&f, 1, 1))
            .unwrap();
        let NftEffect::Minted { token_id, .. } = effect.nft_effects[0].clone() else {
            panic!("expected a mint");
        };
        assert_eq!(token_id, U256::from(nft_id));
        let balance =
            |f: &Fixture| f.editions.nfts().balance_of(f.nft, U256::from(nft_id), f.buyer);
        assert_eq!(balance(&f), U256::from(1));

        f.editions.mint(&terms(&f, nft_id), &buy(&f, 1, 1)).unwrap();
        assert_eq!(balance(&f), U256::from(2));

        // A used offer falls through to a plain mint.
        f.editions
            .mint_new(&signed_offer, &attestation, &buy(&f, 3, 3))
            .unwrap();
        assert_eq!(balance(&f), U256::from(5));

        let err = f.editions.mint(&terms(&f, nft_id), &buy(&f, 95, 94)).unwrap_err();
        assert!(matches!(err, SealedPoolError::ValueMismatch { .. }));

        let err = f.editions.mint(&terms(&f, nft_id), &buy(&f, 96, 95)).unwrap_err();
        assert!(matches!(err, SealedPoolError::LimitExceeded { limit } if limit == ">maxToMint"));

        let seller = f.seller.address();
        f.editions.stop_mint(seller, &terms(&f, nft_id)).unwrap();
        let err = f.editions.mint(&terms(&f, nft_id), &buy(&f, 1, 1)).unwrap_err();
        assert!(matches!(err, SealedPoolError::ArithmeticOverflow));

        assert_eq!(f.editions.nfts().uri(f.nft, U256::from(nft_id)), Some(URI));
    }

    #[test]
    fn payouts_split_between_seller_and_fee() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        let effect = f.editions.mint_new(&o, &a, &buy(&f, 10, 10)).unwrap();
        assert_eq!(effect.total_payout(), Some(eth(1)));
        assert_eq!(effect.payouts[0].to, f.seller.address());
        assert_eq!(effect.payouts[1].to, f.editions.address());
    }

    #[test]
    fn attestation_is_bound_to_buyer() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        let mut other = buy(&f, 1, 1);
        other.buyer = Address::repeat_byte(0xcc);
        let err = f.editions.mint_new(&o, &a, &other).unwrap_err();
        assert!(matches!(err, SealedPoolError::OperatorRejected { .. }));
    }

    #[test]
    fn forged_attestation_rejected() {
        let mut f = fixture(Arc::new(NoDelegates));
        let offer = sell_offer(&f);
        let domain = f.editions.roles().domain().clone();
        let stamp = MintOfferAttestation {
            deadline: U256::from(NOW + 600),
            offerHash: offer_hash(f.buyer, f.seller.address(), &offer),
        };
        let o = SignedSellOffer::from_parts(&offer, f.seller.sign(&offer, &domain));
        let a = SignedMintOfferAttestation::from_parts(&stamp, f.seller.sign(&stamp, &domain));
        assert!(matches!(
            f.editions.mint_new(&o, &a, &buy(&f, 1, 1)),
            Err(SealedPoolError::InvalidSignature)
        ));
    }

    #[test]
    fn stop_mint_is_seller_only() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        f.editions.mint_new(&o, &a, &buy(&f, 1, 1)).unwrap();
        let err = f.editions.stop_mint(f.buyer, &terms(&f, 4)).unwrap_err();
        assert!(matches!(err, SealedPoolError::Unauthorized { .. }));
    }

    #[test]
    fn stale_counter_blocks_new_editions() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        let seller = f.seller.address();
        f.editions.increase_counter(seller).unwrap();
        f.editions.increase_counter(seller).unwrap();
        assert!(matches!(
            f.editions.mint_new(&o, &a, &buy(&f, 1, 1)),
            Err(SealedPoolError::StaleCounter { .. })
        ));
    }

    #[test]
    fn rules_gate_minting() {
        let hot = Address::repeat_byte(0x40);
        let mut f = fixture(Arc::new(StaticDelegates::new().with(
            TestSigner::from_seed(2).address(),
            hot,
        )));
        let (o, a) = signed(&f, &sell_offer(&f));
        f.editions.mint_new(&o, &a, &buy(&f, 1, 1)).unwrap();
        let t = terms(&f, 4);

        let stranger = Address::repeat_byte(0x41);
        assert!(matches!(
            f.editions.set_rules(stranger, &t, EditionRules::default()),
            Err(SealedPoolError::Unauthorized { .. })
        ));

        f.editions
            .set_rules(
                hot,
                &t,
                EditionRules {
                    start_date: 0,
                    max_per_wallet: U256::from(2),
                    allowlist_root: None,
                },
            )
            .unwrap();
        f.editions.mint(&t, &buy(&f, 1, 1)).unwrap();
        assert!(matches!(
            f.editions.mint(&t, &buy(&f, 1, 1)),
            Err(SealedPoolError::LimitExceeded { ref limit }) if limit == ">maxPerWallet"
        ));

        f.editions
            .set_rules(
                hot,
                &t,
                EditionRules {
                    start_date: NOW + 10,
                    ..EditionRules::default()
                },
            )
            .unwrap();
        assert!(matches!(
            f.editions.mint(&t, &buy(&f, 1, 1)),
            Err(SealedPoolError::LimitExceeded { ref limit }) if limit == "<startDate"
        ));
    }

    #[test]
    fn allowlist_requires_proof() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        f.editions.mint_new(&o, &a, &buy(&f, 1, 1)).unwrap();
        let t = terms(&f, 4);

        let leaves = vec![
            merkle::leaf(f.buyer),
            merkle::leaf(Address::repeat_byte(0x01)),
            merkle::leaf(Address::repeat_byte(0x02)),
        ];
        let (root, proofs) = merkle::build(&leaves);
        let seller = f.seller.address();
        f.editions
            .set_rules(
                seller,
                &t,
                EditionRules {
                    allowlist_root: Some(root),
                    ..EditionRules::default()
                },
            )
            .unwrap();

        assert!(matches!(
            f.editions.mint(&t, &buy(&f, 1, 1)),
            Err(SealedPoolError::BadProof)
        ));
        let mut with_proof = buy(&f, 1, 1);
        with_proof.proof = proofs[0].clone();
        f.editions.mint(&t, &with_proof).unwrap();
    }

    #[test]
    fn end_date_enforced() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        f.editions.mint_new(&o, &a, &buy(&f, 1, 1)).unwrap();
        let mut late = buy(&f, 1, 1);
        late.now = NOW + 601;
        assert!(matches!(
            f.editions.mint(&terms(&f, 4), &late),
            Err(SealedPoolError::Expired { .. })
        ));
    }

    #[test]
    fn cancelled_offer_cannot_create_an_edition() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        let seller = f.seller.address();
        f.editions.cancel_offer(seller, U256::from(1)).unwrap();
        assert!(f.editions.is_offer_used(seller, U256::from(1)));
        assert!(matches!(
            f.editions.cancel_offer(seller, U256::from(1)),
            Err(SealedPoolError::Replayed { .. })
        ));

        assert!(matches!(
            f.editions.mint_new(&o, &a, &buy(&f, 1, 1)),
            Err(SealedPoolError::Replayed { .. })
        ));
        assert_eq!(f.editions.minted(&terms(&f, 4)), None);
    }

    #[test]
    fn offer_nonce_is_spent_by_the_edition_it_creates() {
        let mut f = fixture(Arc::new(NoDelegates));
        let (o, a) = signed(&f, &sell_offer(&f));
        f.editions.mint_new(&o, &a, &buy(&f, 1, 1)).unwrap();
        let seller = f.seller.address();
        assert!(f.editions.is_offer_used(seller, U256::from(1)));

        // Same nonce, different uri: a second edition is refused.
        let mut other = sell_offer(&f);
        other.uri = "ipfs://other".into();
        let (o2, a2) = signed(&f, &other);
        assert!(matches!(
            f.editions.mint_new(&o2, &a2, &buy(&f, 1, 1)),
            Err(SealedPoolError::Replayed { .. })
        ));

        // The original offer still falls through to a mint.
        f.editions.mint_new(&o, &a, &buy(&f, 1, 1)).unwrap();
        assert_eq!(f.editions.minted(&terms(&f, 4)), Some(U256::from(2)));
    }
}

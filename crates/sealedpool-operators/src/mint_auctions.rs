//! Mint-on-sale: a buyer pays for a piece that is minted at settlement.
//!
//! The seller (or whoever the configured signer role names) signs a
//! `MintOffer` over `mintHash = keccak256(abi.encode(nftContract, uri))` and a
//! minimum price. The buyer's action data carries that signed offer plus a
//! pointer `{mintHash, counter, nonce}` at it; the sequencer stamps the
//! `{seller, nftContract, uri}` being minted.
//!
//! Offers die three ways: their deadline passes, the seller bumps their
//! counter above the offer's, or the seller cancels the offer's nonce.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use sealedpool_types::{
    Effect, NftEffect, Operator, OperatorCall, Prepared, Result, SealedPoolError,
    ensure_not_expired,
};
use serde::{Deserialize, Serialize};

use crate::abi::{self, SequencerStamp, mintWithOfferCall};
use crate::delegate::{DelegateRegistry, acts_for};
use crate::nft::NftLedger;
use crate::roles::OperatorRoles;

/// `keccak256(abi.encode(nftContract, uri))`.
#[must_use]
pub fn mint_hash(nft_contract: Address, uri: &str) -> B256 {
    keccak256((nft_contract, uri.to_owned()).abi_encode_params())
}

/// Who must sign `MintOffer`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferSigner {
    /// The stamped seller or one of its delegates.
    Seller,
    /// The operator's sequencer.
    Sequencer,
}

#[derive(Debug)]
struct MintCommit {
    seller: Address,
    nonce: U256,
    nft_contract: Address,
    token_id: U256,
    uri: String,
    buyer: Address,
}

/// The mint-auction operator.
pub struct MintAuctions {
    roles: OperatorRoles,
    signer_role: OfferSigner,
    delegates: Arc<dyn DelegateRegistry>,
    counters: HashMap<Address, U256>,
    used_nonces: HashSet<(Address, U256)>,
    nfts: NftLedger,
}

impl std::fmt::Debug for MintAuctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintAuctions")
            .field("roles", &self.roles)
            .field("signer_role", &self.signer_role)
            .field("used_nonces", &self.used_nonces.len())
            .finish_non_exhaustive()
    }
}

impl MintAuctions {
    pub fn new(
        roles: OperatorRoles,
        signer_role: OfferSigner,
        delegates: Arc<dyn DelegateRegistry>,
    ) -> Self {
        Self {
            roles,
            signer_role,
            delegates,
            counters: HashMap::new(),
            used_nonces: HashSet::new(),
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

    #[must_use]
    pub fn signer_role(&self) -> OfferSigner {
        self.signer_role
    }

    /// Owner-only.
    pub fn set_signer_role(&mut self, caller: Address, role: OfferSigner) -> Result<()> {
        self.roles.ensure_owner(caller)?;
        self.signer_role = role;
        Ok(())
    }

    /// The seller's current counter.
    #[must_use]
    pub fn counter(&self, seller: Address) -> U256 {
        self.counters.get(&seller).copied().unwrap_or_default()
    }

    /// Invalidate every offer `caller` signed with the current counter.
    /// Returns the new counter.
    pub fn increase_counter(&mut self, caller: Address) -> Result<U256> {
        let counter = self.counters.entry(caller).or_default();
        *counter = counter
            .checked_add(U256::from(1))
            .ok_or(SealedPoolError::ArithmeticOverflow)?;
        tracing::info!(seller = %caller, counter = %*counter, "offer counter increased");
        Ok(*counter)
    }

    /// Invalidate one offer nonce of `caller`.
    pub fn cancel_offer(&mut self, caller: Address, nonce: U256) -> Result<()> {
        if !self.used_nonces.insert((caller, nonce)) {
            return Err(SealedPoolError::Replayed {
                account: caller,
                nonce,
            });
        }
        tracing::info!(seller = %caller, nonce = %nonce, "offer cancelled");
        Ok(())
    }

    #[must_use]
    pub fn is_offer_used(&self, seller: Address, nonce: U256) -> bool {
        self.used_nonces.contains(&(seller, nonce))
    }

    fn authorized_signer(&self, seller: Address, signer: Address) -> bool {
        match self.signer_role {
            OfferSigner::Seller => acts_for(self.delegates.as_ref(), seller, signer),
            OfferSigner::Sequencer => signer == self.roles.sequencer(),
        }
    }

    fn prepare_mint(&self, call: &OperatorCall) -> Result<Prepared> {
        let args: mintWithOfferCall = abi::decode_args(&call.data)?;
        let stamp = SequencerStamp::abi_decode(&call.attestation_data)?;
        let offer = &args.sellerOffer;
        let pointer = &args.buyerOffer;

        let expected = mint_hash(stamp.nftContract, &stamp.uri);
        if pointer.mintHash != expected || offer.mintHash != expected {
            return Err(SealedPoolError::rejected("mintHash"));
        }
        if pointer.counter != offer.counter || pointer.nonce != offer.nonce {
            return Err(SealedPoolError::rejected("buyer offer does not match seller offer"));
        }

        let signer = self
            .roles
            .verifier()
            .recover(&offer.typed(), &offer.signature())?;
        if !self.authorized_signer(stamp.seller, signer) {
            tracing::debug!(
                signer = %signer,
                seller = %stamp.seller,
                role = ?self.signer_role,
                "mint offer signed by unauthorized key"
            );
            return Err(SealedPoolError::InvalidSignature);
        }

        ensure_not_expired(offer.deadline, call.now)?;

        let current = self.counter(stamp.seller);
        if offer.counter < current {
            tracing::warn!(
                seller = %stamp.seller,
                offered = %offer.counter,
                current = %current,
                "stale offer counter"
            );
            return Err(SealedPoolError::StaleCounter {
                offered: offer.counter,
                current,
            });
        }
        if self.is_offer_used(stamp.seller, offer.nonce) {
            tracing::warn!(seller = %stamp.seller, nonce = %offer.nonce, "mint offer reused");
            return Err(SealedPoolError::Replayed {
                account: stamp.seller,
                nonce: offer.nonce,
            });
        }
        if call.value < offer.amount {
            return Err(SealedPoolError::ValueMismatch {
                expected: offer.amount,
                actual: call.value,
            });
        }

        let token_id = self.nfts.next_token_id(stamp.nftContract);
        let effect = Effect {
            payouts: self.roles.split(stamp.seller, call.value),
            nft_effects: vec![NftEffect::Minted {
                nft_contract: stamp.nftContract,
                token_id,
                to: call.account,
                quantity: U256::from(1),
            }],
        };
        Ok(Prepared::new(
            effect,
            MintCommit {
                seller: stamp.seller,
                nonce: offer.nonce,
                nft_contract: stamp.nftContract,
                token_id,
                uri: stamp.uri,
                buyer: call.account,
            },
        ))
    }
}

impl Operator for MintAuctions {
    fn address(&self) -> Address {
        self.roles.address()
    }

    fn kind(&self) -> &'static str {
        "mint_auctions"
    }

    fn prepare(&self, call: &OperatorCall) -> Result<Prepared> {
        if call.selector == abi::selector::<mintWithOfferCall>() {
            self.prepare_mint(call)
        } else {
            Err(SealedPoolError::UnknownSelector {
                operator: self.address(),
                selector: alloy_primitives::hex::encode(call.selector),
            })
        }
    }

    fn commit(&mut self, prepared: Prepared) {
        let Some(c) = prepared.into_commit::<MintCommit>() else {
            tracing::error!(operator = %self.address(), "foreign commit handed to mint auctions");
            return;
        };
        self.used_nonces.insert((c.seller, c.nonce));
        self.nfts
            .mint_with_uri(c.nft_contract, c.buyer, c.token_id, &c.uri);
        tracing::info!(
            seller = %c.seller,
            buyer = %c.buyer,
            nft = %c.nft_contract,
            token_id = %c.token_id,
            "minted on offer"
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
    use crate::abi::{BuyerOffer, SignedMintOffer, encode_args};
    use crate::delegate::{NoDelegates, StaticDelegates};
    use sealedpool_types::testing::eth;
    use sealedpool_types::{Bytes, MintOffer, TestSigner};

    const NOW: u64 = 1_700_000_000;

    struct Fixture {
        op: MintAuctions,
        sequencer: TestSigner,
        artist: TestSigner,
        buyer: Address,
        nft: Address,
    }

    fn fixture(role: OfferSigner, delegates: Arc<dyn DelegateRegistry>) -> Fixture {
        let sequencer = TestSigner::from_seed(1);
        let roles = OperatorRoles::new(
            Address::repeat_byte(0xb0),
            sequencer.address(),
            sequencer.address(),
            31_337,
        )
        .unwrap();
        Fixture {
            op: MintAuctions::new(roles, role, delegates),
            sequencer,
            artist: TestSigner::from_seed(7),
            buyer: Address::repeat_byte(0xbb),
            nft: Address::repeat_byte(0x29),
        }
    }

    fn offer(f: &Fixture, counter: u64, nonce: u64) -> MintOffer {
        MintOffer {
            mintHash: mint_hash(f.nft, "URI"),
            amount: eth(2),
            deadline: U256::from(NOW + 600),
            counter: U256::from(counter),
            nonce: U256::from(nonce),
        }
    }

    fn call(f: &Fixture, offer: &MintOffer, signer: &TestSigner, value: U256) -> OperatorCall {
        let args = mintWithOfferCall {
            buyerOffer: BuyerOffer {
                mintHash: offer.mintHash,
                counter: offer.counter,
                nonce: offer.nonce,
            },
            sellerOffer: SignedMintOffer::from_parts(
                offer,
                signer.sign(offer, f.op.roles().domain()),
            ),
        };
        let stamp = SequencerStamp {
            seller: f.artist.address(),
            nftContract: f.nft,
            uri: "URI".into(),
        };
        OperatorCall {
            account: f.buyer,
            selector: abi::selector::<mintWithOfferCall>(),
            data: encode_args(&args),
            attestation_data: Bytes::from(stamp.abi_encode()),
            value,
            now: NOW,
        }
    }

    #[test]
    fn sequencer_signed_offer_mints_to_buyer() {
        let mut f = fixture(OfferSigner::Sequencer, Arc::new(NoDelegates));
        let o = offer(&f, 1, 1);
        let c = call(&f, &o, &f.sequencer, eth(3));
        let effect = crate::execute(&mut f.op, &c).unwrap();

        assert_eq!(effect.total_payout(), Some(eth(3)));
        assert_eq!(effect.payouts[0].to, f.artist.address());
        let NftEffect::Minted { token_id, to, .. } = effect.nft_effects[0].clone() else {
            panic!("expected a mint");
        };
        assert_eq!(to, f.buyer);
        assert_eq!(f.op.nfts().owner_of(f.nft, token_id), Some(f.buyer));
        assert_eq!(f.op.nfts().uri(f.nft, token_id), Some("URI"));
    }

    #[test]
    fn seller_role_rejects_sequencer_signature() {
        let f = fixture(OfferSigner::Seller, Arc::new(NoDelegates));
        let o = offer(&f, 1, 1);
        let c = call(&f, &o, &f.sequencer, eth(2));
        assert!(matches!(f.op.prepare(&c), Err(SealedPoolError::InvalidSignature)));

        let c = call(&f, &o, &f.artist, eth(2));
        f.op.prepare(&c).unwrap();
    }

    #[test]
    fn seller_role_accepts_delegate() {
        let hot = TestSigner::from_seed(9);
        let artist = TestSigner::from_seed(7).address();
        let f = fixture(
            OfferSigner::Seller,
            Arc::new(StaticDelegates::new().with(artist, hot.address())),
        );
        let o = offer(&f, 0, 1);
        f.op.prepare(&call(&f, &o, &hot, eth(2))).unwrap();
    }

    #[test]
    fn counter_bump_invalidates_older_offers() {
        let mut f = fixture(OfferSigner::Seller, Arc::new(NoDelegates));
        let o = offer(&f, 1, 1);
        let artist = f.artist.address();
        assert_eq!(f.op.increase_counter(artist).unwrap(), U256::from(1));
        f.op.prepare(&call(&f, &o, &f.artist, eth(2))).unwrap();

        f.op.increase_counter(artist).unwrap();
        let err = f.op.prepare(&call(&f, &o, &f.artist, eth(2))).unwrap_err();
        assert!(matches!(err, SealedPoolError::StaleCounter { .. }));
    }

    #[test]
    fn offer_nonce_single_use() {
        let mut f = fixture(OfferSigner::Seller, Arc::new(NoDelegates));
        let o = offer(&f, 0, 5);
        let c = call(&f, &o, &f.artist, eth(2));
        crate::execute(&mut f.op, &c).unwrap();
        assert!(matches!(f.op.prepare(&c), Err(SealedPoolError::Replayed { .. })));
    }

    #[test]
    fn cancelled_offer_rejected() {
        let mut f = fixture(OfferSigner::Seller, Arc::new(NoDelegates));
        let o = offer(&f, 0, 5);
        f.op.cancel_offer(f.artist.address(), U256::from(5)).unwrap();
        let c = call(&f, &o, &f.artist, eth(2));
        assert!(matches!(f.op.prepare(&c), Err(SealedPoolError::Replayed { .. })));
    }

    #[test]
    fn underpayment_and_expiry_rejected() {
        let f = fixture(OfferSigner::Seller, Arc::new(NoDelegates));
        let o = offer(&f, 0, 1);
        let c = call(&f, &o, &f.artist, eth(1));
        assert!(matches!(f.op.prepare(&c), Err(SealedPoolError::ValueMismatch { .. })));

        let mut late = call(&f, &o, &f.artist, eth(2));
        late.now = NOW + 601;
        assert!(matches!(f.op.prepare(&late), Err(SealedPoolError::Expired { .. })));
    }

    #[test]
    fn stamp_must_match_mint_hash() {
        let f = fixture(OfferSigner::Seller, Arc::new(NoDelegates));
        let mut o = offer(&f, 0, 1);
        o.mintHash = mint_hash(f.nft, "OTHER");
        let c = call(&f, &o, &f.artist, eth(2));
        assert!(matches!(
            f.op.prepare(&c),
            Err(SealedPoolError::OperatorRejected { .. })
        ));
    }
}

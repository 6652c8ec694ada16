//! Sealed-bid auctions of escrowed NFTs.
//!
//! ```text
//!   create_auction ──▶ LIVE (NFT held by the operator)
//!        │                 │
//!        │                 ├── settleAuction (attested)  ──▶ SETTLED (NFT → winner)
//!        │                 ├── settleAuctionLegacy       ──▶ SETTLED
//!        │                 └── cancel_auction (seller)   ──▶ removed (NFT → seller)
//! ```
//!
//! Bids never touch this operator directly. The sequencer collects them off
//! chain and attests the winner; the engine debits the winner and this
//! operator pays the seller (minus the protocol fee) and releases the NFT.

use std::any::Any;
use std::collections::HashMap;

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use sealedpool_types::{
    BidWinner, Effect, NftEffect, Operator, OperatorCall, Prepared, Result, SealedPoolError,
};
use serde::{Deserialize, Serialize};

use crate::abi::{self, settleAuctionCall, settleAuctionLegacyCall};
use crate::nft::NftLedger;
use crate::roles::OperatorRoles;

/// `keccak256(abi.encode(seller, nftContract, auctionType, tokenId, reserve))`.
#[must_use]
pub fn auction_id(
    seller: Address,
    nft_contract: Address,
    auction_type: B256,
    token_id: U256,
    reserve: U256,
) -> B256 {
    keccak256((seller, nft_contract, auction_type, token_id, reserve).abi_encode_params())
}

/// One escrowed auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub seller: Address,
    pub nft_contract: Address,
    pub auction_type: B256,
    pub token_id: U256,
    pub reserve: U256,
    pub settled: bool,
}

#[derive(Debug)]
struct SettleCommit {
    auction_id: B256,
    winner: Address,
}

/// The auction operator.
#[derive(Debug)]
pub struct Auctions {
    roles: OperatorRoles,
    auctions: HashMap<B256, Auction>,
    nfts: NftLedger,
}

impl Auctions {
    pub fn new(
        address: Address,
        owner: Address,
        sequencer: Address,
        chain_id: u64,
    ) -> Result<Self> {
        Ok(Self {
            roles: OperatorRoles::new(address, owner, sequencer, chain_id)?,
            auctions: HashMap::new(),
            nfts: NftLedger::new(),
        })
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
    pub fn auction(&self, auction_id: B256) -> Option<&Auction> {
        self.auctions.get(&auction_id)
    }

    /// Escrow `token_id` and open an auction for it. Returns the auction id.
    ///
    /// # Errors
    /// - `Unauthorized` if `seller` does not own the token
    /// - `OperatorRejected` if the same auction already exists
    pub fn create_auction(
        &mut self,
        seller: Address,
        nft_contract: Address,
        auction_type: B256,
        token_id: U256,
        reserve: U256,
    ) -> Result<B256> {
        let id = auction_id(seller, nft_contract, auction_type, token_id, reserve);
        if self.auctions.contains_key(&id) {
            return Err(SealedPoolError::rejected("auction already exists"));
        }
        self.nfts
            .transfer(nft_contract, token_id, seller, self.roles.address())?;
        self.auctions.insert(
            id,
            Auction {
                seller,
                nft_contract,
                auction_type,
                token_id,
                reserve,
                settled: false,
            },
        );
        tracing::info!(
            auction_id = %id,
            seller = %seller,
            nft = %nft_contract,
            token_id = %token_id,
            reserve = %reserve,
            "auction created"
        );
        Ok(id)
    }

    /// Close an unsettled auction and return the NFT to its seller.
    pub fn cancel_auction(&mut self, caller: Address, auction_id: B256) -> Result<()> {
        let auction = self.live_auction(auction_id)?;
        if auction.seller != caller {
            return Err(SealedPoolError::unauthorized("only the seller may cancel"));
        }
        let (nft_contract, token_id, seller) =
            (auction.nft_contract, auction.token_id, auction.seller);
        self.nfts
            .transfer(nft_contract, token_id, self.roles.address(), seller)?;
        self.auctions.remove(&auction_id);
        tracing::info!(auction_id = %auction_id, "auction cancelled");
        Ok(())
    }

    fn live_auction(&self, auction_id: B256) -> Result<&Auction> {
        match self.auctions.get(&auction_id) {
            None => Err(SealedPoolError::rejected(format!(
                "unknown auction {auction_id}"
            ))),
            Some(a) if a.settled => Err(SealedPoolError::rejected("auction already settled")),
            Some(a) => Ok(a),
        }
    }

    fn prepare_settlement(
        &self,
        auction_id: B256,
        winner: Address,
        amount: U256,
    ) -> Result<Prepared> {
        let auction = self.live_auction(auction_id)?;
        if amount < auction.reserve {
            return Err(SealedPoolError::limit("<reserve"));
        }
        let effect = Effect {
            payouts: self.roles.split(auction.seller, amount),
            nft_effects: vec![NftEffect::Transferred {
                nft_contract: auction.nft_contract,
                token_id: auction.token_id,
                from: self.roles.address(),
                to: winner,
            }],
        };
        Ok(Prepared::new(effect, SettleCommit { auction_id, winner }))
    }

    /// Winner attested through the action attestation.
    fn prepare_attested(&self, call: &OperatorCall) -> Result<Prepared> {
        let args: settleAuctionCall = abi::decode_args(&call.data)?;
        let result = BidWinner::abi_decode(&call.attestation_data)?;
        if result.auctionId != args.auctionId {
            return Err(SealedPoolError::rejected("attested auction differs from call"));
        }
        if result.winner != call.account {
            return Err(SealedPoolError::rejected("winner is not the paying account"));
        }
        if result.amount != call.value {
            return Err(SealedPoolError::ValueMismatch {
                expected: result.amount,
                actual: call.value,
            });
        }
        self.prepare_settlement(args.auctionId, result.winner, result.amount)
    }

    /// Bidder-signed `Bid` plus sequencer-signed `BidWinner`.
    fn prepare_legacy(&self, call: &OperatorCall) -> Result<Prepared> {
        let args: settleAuctionLegacyCall = abi::decode_args(&call.data)?;
        let bid = args.bid.typed();
        let result = args.winner.typed();
        let verifier = self.roles.verifier();

        verifier.verify(&result, &args.winner.signature(), self.roles.sequencer())?;
        verifier.verify(&bid, &args.bid.signature(), result.winner)?;

        if bid.auctionId != result.auctionId {
            return Err(SealedPoolError::rejected("bid is for a different auction"));
        }
        if result.winner != call.account {
            return Err(SealedPoolError::rejected("winner is not the paying account"));
        }
        if result.amount > bid.maxAmount {
            return Err(SealedPoolError::AmountExceedsMax {
                amount: result.amount,
                max_amount: bid.maxAmount,
            });
        }
        if result.amount != call.value {
            return Err(SealedPoolError::ValueMismatch {
                expected: result.amount,
                actual: call.value,
            });
        }
        self.prepare_settlement(result.auctionId, result.winner, result.amount)
    }
}

impl Operator for Auctions {
    fn address(&self) -> Address {
        self.roles.address()
    }

    fn kind(&self) -> &'static str {
        "auctions"
    }

    fn prepare(&self, call: &OperatorCall) -> Result<Prepared> {
        if call.selector == abi::selector::<settleAuctionCall>() {
            self.prepare_attested(call)
        } else if call.selector == abi::selector::<settleAuctionLegacyCall>() {
            self.prepare_legacy(call)
        } else {
            Err(SealedPoolError::UnknownSelector {
                operator: self.address(),
                selector: alloy_primitives::hex::encode(call.selector),
            })
        }
    }

    fn commit(&mut self, prepared: Prepared) {
        let Some(SettleCommit { auction_id, winner }) = prepared.into_commit() else {
            tracing::error!(operator = %self.address(), "foreign commit handed to auctions");
            return;
        };
        if let Some(auction) = self.auctions.get_mut(&auction_id) {
            auction.settled = true;
            self.nfts.mint_id(auction.nft_contract, winner, auction.token_id);
            tracing::info!(auction_id = %auction_id, winner = %winner, "auction settled");
        }
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
    use crate::abi::{SignedBid, SignedBidWinner, encode_args};
    use sealedpool_types::testing::eth;
    use sealedpool_types::{Bid, Bytes, TestSigner};

    const SAMPLE_AUCTION_TYPE: B256 = B256::with_last_byte(1);

    struct Fixture {
        auctions: Auctions,
        sequencer: TestSigner,
        seller: Address,
        buyer: TestSigner,
        nft: Address,
        id: B256,
    }

    fn fixture() -> Fixture {
        let sequencer = TestSigner::from_seed(1);
        let seller = Address::repeat_byte(0x5e);
        let buyer = TestSigner::from_seed(3);
        let nft = Address::repeat_byte(0x0a);
        let mut auctions = Auctions::new(
            Address::repeat_byte(0xa0),
            sequencer.address(),
            sequencer.address(),
            31_337,
        )
        .unwrap();
        auctions.nfts_mut().mint_id(nft, seller, U256::from(34));
        let id = auctions
            .create_auction(seller, nft, SAMPLE_AUCTION_TYPE, U256::from(34), eth(1))
            .unwrap();
        Fixture {
            auctions,
            sequencer,
            seller,
            buyer,
            nft,
            id,
        }
    }

    fn attested_call(f: &Fixture, amount: U256) -> OperatorCall {
        let result = BidWinner {
            auctionId: f.id,
            amount,
            winner: f.buyer.address(),
        };
        OperatorCall {
            account: f.buyer.address(),
            selector: abi::selector::<settleAuctionCall>(),
            data: encode_args(&settleAuctionCall { auctionId: f.id }),
            attestation_data: Bytes::from(result.abi_encode()),
            value: amount,
            now: 1_000,
        }
    }

    #[test]
    fn create_escrows_the_nft() {
        let f = fixture();
        assert_eq!(
            f.auctions.nfts().owner_of(f.nft, U256::from(34)),
            Some(f.auctions.address())
        );
        assert_eq!(
            f.id,
            auction_id(f.seller, f.nft, SAMPLE_AUCTION_TYPE, U256::from(34), eth(1))
        );
    }

    #[test]
    fn create_requires_ownership() {
        let mut f = fixture();
        let err = f
            .auctions
            .create_auction(f.seller, f.nft, SAMPLE_AUCTION_TYPE, U256::from(99), eth(1))
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::Unauthorized { .. }));
    }

    #[test]
    fn attested_settlement_pays_seller_and_moves_nft() {
        let mut f = fixture();
        let call = attested_call(&f, eth(1));
        let effect = crate::execute(&mut f.auctions, &call).unwrap();

        assert_eq!(effect.total_payout(), Some(eth(1)));
        assert_eq!(effect.payouts[0].to, f.seller);
        assert_eq!(
            f.auctions.nfts().owner_of(f.nft, U256::from(34)),
            Some(f.buyer.address())
        );
        assert!(f.auctions.auction(f.id).unwrap().settled);

        let err = crate::execute(&mut f.auctions, &call).unwrap_err();
        assert!(matches!(err, SealedPoolError::OperatorRejected { .. }));
    }

    #[test]
    fn reserve_enforced() {
        let f = fixture();
        let err = f
            .auctions
            .prepare(&attested_call(&f, eth(1) / U256::from(2)))
            .unwrap_err();
        assert!(matches!(
            err,
            SealedPoolError::LimitExceeded { ref limit } if limit == "<reserve"
        ));
    }

    #[test]
    fn prepare_does_not_mutate() {
        let f = fixture();
        f.auctions.prepare(&attested_call(&f, eth(1))).unwrap();
        assert!(!f.auctions.auction(f.id).unwrap().settled);
    }

    #[test]
    fn legacy_settlement_checks_both_signatures() {
        let mut f = fixture();
        let domain = f.auctions.roles().domain().clone();
        let bid = Bid {
            auctionId: f.id,
            maxAmount: eth(2),
        };
        let result = BidWinner {
            auctionId: f.id,
            amount: eth(1),
            winner: f.buyer.address(),
        };
        let good = settleAuctionLegacyCall {
            bid: SignedBid::from_parts(&bid, f.buyer.sign(&bid, &domain)),
            winner: SignedBidWinner::from_parts(&result, f.sequencer.sign(&result, &domain)),
        };
        let call = OperatorCall {
            account: f.buyer.address(),
            selector: abi::selector::<settleAuctionLegacyCall>(),
            data: encode_args(&good),
            attestation_data: Bytes::new(),
            value: eth(1),
            now: 1_000,
        };

        let forged = settleAuctionLegacyCall {
            bid: good.bid.clone(),
            winner: SignedBidWinner::from_parts(&result, f.buyer.sign(&result, &domain)),
        };
        let forged_call = OperatorCall {
            data: encode_args(&forged),
            ..call.clone()
        };
        assert!(matches!(
            f.auctions.prepare(&forged_call),
            Err(SealedPoolError::InvalidSignature)
        ));

        crate::execute(&mut f.auctions, &call).unwrap();
        assert!(f.auctions.auction(f.id).unwrap().settled);
    }

    #[test]
    fn legacy_amount_capped_by_bid() {
        let f = fixture();
        let domain = f.auctions.roles().domain().clone();
        let bid = Bid {
            auctionId: f.id,
            maxAmount: eth(1),
        };
        let result = BidWinner {
            auctionId: f.id,
            amount: eth(2),
            winner: f.buyer.address(),
        };
        let args = settleAuctionLegacyCall {
            bid: SignedBid::from_parts(&bid, f.buyer.sign(&bid, &domain)),
            winner: SignedBidWinner::from_parts(&result, f.sequencer.sign(&result, &domain)),
        };
        let call = OperatorCall {
            account: f.buyer.address(),
            selector: abi::selector::<settleAuctionLegacyCall>(),
            data: encode_args(&args),
            attestation_data: Bytes::new(),
            value: eth(2),
            now: 1_000,
        };
        assert!(matches!(
            f.auctions.prepare(&call),
            Err(SealedPoolError::AmountExceedsMax { .. })
        ));
    }

    #[test]
    fn cancel_returns_nft_to_seller() {
        let mut f = fixture();
        assert!(f.auctions.cancel_auction(f.buyer.address(), f.id).is_err());
        f.auctions.cancel_auction(f.seller, f.id).unwrap();
        assert!(f.auctions.auction(f.id).is_none());
        assert_eq!(
            f.auctions.nfts().owner_of(f.nft, U256::from(34)),
            Some(f.seller)
        );
    }

    #[test]
    fn unknown_selector_rejected() {
        let f = fixture();
        let mut call = attested_call(&f, eth(1));
        call.selector = sealedpool_types::FixedBytes([0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            f.auctions.prepare(&call),
            Err(SealedPoolError::UnknownSelector { .. })
        ));
    }
}

//! ABI layouts of operator call data and attestation payloads.
//!
//! An action envelope carries a 4-byte selector and the ABI-encoded
//! arguments separately, so helpers here encode and decode arguments
//! without the selector prefix.

use alloy_primitives::{Bytes, FixedBytes};
use alloy_sol_types::{SolCall, sol};
use sealedpool_types::{
    Bid, BidWinner, MintOffer, MintOfferAttestation, Result, SellOffer, SignatureParts,
};

sol! {
    /// Buyer's pointer at the seller offer it accepts.
    #[derive(Debug, PartialEq, Eq)]
    struct BuyerOffer {
        bytes32 mintHash;
        uint256 counter;
        uint256 nonce;
    }

    /// A `MintOffer` and its signature.
    #[derive(Debug, PartialEq, Eq)]
    struct SignedMintOffer {
        uint8 v;
        bytes32 r;
        bytes32 s;
        bytes32 mintHash;
        uint256 amount;
        uint256 deadline;
        uint256 counter;
        uint256 nonce;
    }

    /// Sequencer-attested mint target.
    #[derive(Debug, PartialEq, Eq)]
    struct SequencerStamp {
        address seller;
        address nftContract;
        string uri;
    }

    /// A `Bid` and the bidder's signature.
    #[derive(Debug, PartialEq, Eq)]
    struct SignedBid {
        bytes32 auctionId;
        uint256 maxAmount;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    /// A `BidWinner` and the sequencer's signature.
    #[derive(Debug, PartialEq, Eq)]
    struct SignedBidWinner {
        bytes32 auctionId;
        uint256 amount;
        address winner;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    /// A `SellOffer` and the seller's signature.
    #[derive(Debug, PartialEq, Eq)]
    struct SignedSellOffer {
        address nftContract;
        string uri;
        uint256 cost;
        uint256 endDate;
        uint256 maxToMint;
        uint256 deadline;
        uint256 counter;
        uint256 nonce;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    /// A `MintOfferAttestation` and the sequencer's signature.
    #[derive(Debug, PartialEq, Eq)]
    struct SignedMintOfferAttestation {
        uint256 deadline;
        bytes32 offerHash;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    /// Identifies one edition. The seller is part of the identity.
    #[derive(Debug, PartialEq, Eq, Hash)]
    struct EditionTerms {
        address nftContract;
        uint256 tokenId;
        uint256 cost;
        uint256 endDate;
        uint256 maxToMint;
        address seller;
    }

    function settleAuction(bytes32 auctionId);
    function settleAuctionLegacy(SignedBid bid, SignedBidWinner winner);
    function mintWithOffer(BuyerOffer buyerOffer, SignedMintOffer sellerOffer);
    function mintNew(
        SignedSellOffer offer,
        SignedMintOfferAttestation attestation,
        uint256 quantity,
        bytes32[] proof
    );
    #[derive(Debug)]
    function mint(uint256 quantity, EditionTerms terms, bytes32[] proof);
}

/// The selector of `C` as carried in an action envelope.
#[must_use]
pub fn selector<C: SolCall>() -> FixedBytes<4> {
    FixedBytes(C::SELECTOR)
}

/// ABI-encode call arguments without the selector.
#[must_use]
pub fn encode_args<C: SolCall>(call: &C) -> Bytes {
    let mut out = Vec::with_capacity(call.abi_encoded_size());
    call.abi_encode_raw(&mut out);
    out.into()
}

/// Decode call arguments that were encoded without the selector.
pub fn decode_args<C: SolCall>(data: &[u8]) -> Result<C> {
    Ok(C::abi_decode_raw(data)?)
}

impl SignedMintOffer {
    #[must_use]
    pub fn typed(&self) -> MintOffer {
        MintOffer {
            mintHash: self.mintHash,
            amount: self.amount,
            deadline: self.deadline,
            counter: self.counter,
            nonce: self.nonce,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureParts {
        SignatureParts {
            v: self.v,
            r: self.r,
            s: self.s,
        }
    }

    /// Attach `signature` to `offer`.
    #[must_use]
    pub fn from_parts(offer: &MintOffer, signature: SignatureParts) -> Self {
        Self {
            v: signature.v,
            r: signature.r,
            s: signature.s,
            mintHash: offer.mintHash,
            amount: offer.amount,
            deadline: offer.deadline,
            counter: offer.counter,
            nonce: offer.nonce,
        }
    }
}

impl SignedBid {
    #[must_use]
    pub fn typed(&self) -> Bid {
        Bid {
            auctionId: self.auctionId,
            maxAmount: self.maxAmount,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureParts {
        SignatureParts {
            v: self.v,
            r: self.r,
            s: self.s,
        }
    }

    #[must_use]
    pub fn from_parts(bid: &Bid, signature: SignatureParts) -> Self {
        Self {
            auctionId: bid.auctionId,
            maxAmount: bid.maxAmount,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        }
    }
}

impl SignedBidWinner {
    #[must_use]
    pub fn typed(&self) -> BidWinner {
        BidWinner {
            auctionId: self.auctionId,
            amount: self.amount,
            winner: self.winner,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureParts {
        SignatureParts {
            v: self.v,
            r: self.r,
            s: self.s,
        }
    }

    #[must_use]
    pub fn from_parts(winner: &BidWinner, signature: SignatureParts) -> Self {
        Self {
            auctionId: winner.auctionId,
            amount: winner.amount,
            winner: winner.winner,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        }
    }
}

impl SignedSellOffer {
    #[must_use]
    pub fn typed(&self) -> SellOffer {
        SellOffer {
            nftContract: self.nftContract,
            uri: self.uri.clone(),
            cost: self.cost,
            endDate: self.endDate,
            maxToMint: self.maxToMint,
            deadline: self.deadline,
            counter: self.counter,
            nonce: self.nonce,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureParts {
        SignatureParts {
            v: self.v,
            r: self.r,
            s: self.s,
        }
    }

    #[must_use]
    pub fn from_parts(offer: &SellOffer, signature: SignatureParts) -> Self {
        Self {
            nftContract: offer.nftContract,
            uri: offer.uri.clone(),
            cost: offer.cost,
            endDate: offer.endDate,
            maxToMint: offer.maxToMint,
            deadline: offer.deadline,
            counter: offer.counter,
            nonce: offer.nonce,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        }
    }
}

impl SignedMintOfferAttestation {
    #[must_use]
    pub fn typed(&self) -> MintOfferAttestation {
        MintOfferAttestation {
            deadline: self.deadline,
            offerHash: self.offerHash,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureParts {
        SignatureParts {
            v: self.v,
            r: self.r,
            s: self.s,
        }
    }

    #[must_use]
    pub fn from_parts(attestation: &MintOfferAttestation, signature: SignatureParts) -> Self {
        Self {
            deadline: attestation.deadline,
            offerHash: attestation.offerHash,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};

    #[test]
    fn args_roundtrip_without_selector() {
        let call = settleAuctionCall {
            auctionId: B256::repeat_byte(7),
        };
        let data = encode_args(&call);
        assert_eq!(data.len(), 32);
        let back: settleAuctionCall = decode_args(&data).unwrap();
        assert_eq!(back.auctionId, B256::repeat_byte(7));
    }

    #[test]
    fn selectors_are_distinct() {
        let all = [
            selector::<settleAuctionCall>(),
            selector::<settleAuctionLegacyCall>(),
            selector::<mintWithOfferCall>(),
            selector::<mintNewCall>(),
            selector::<mintCall>(),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn truncated_data_is_a_decode_error() {
        let err = decode_args::<mintCall>(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, sealedpool_types::SealedPoolError::Decode(_)));
    }

    #[test]
    fn signed_offer_splits_back_into_parts() {
        let offer = MintOffer {
            mintHash: B256::repeat_byte(1),
            amount: U256::from(2),
            deadline: U256::from(3),
            counter: U256::from(4),
            nonce: U256::from(5),
        };
        let sig = SignatureParts {
            v: 27,
            r: B256::repeat_byte(8),
            s: B256::repeat_byte(9),
        };
        let signed = SignedMintOffer::from_parts(&offer, sig);
        assert_eq!(signed.typed(), offer);
        assert_eq!(signed.signature(), sig);
    }
}

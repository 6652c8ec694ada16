//! EIP-712 typed-data schemas and domains.
//!
//! Field order inside each struct is part of the type hash. These layouts
//! must stay byte-for-byte identical to what wallet signers produce, so never
//! reorder or rename a field.

use alloy_primitives::Address;
use alloy_sol_types::{eip712_domain, sol, Eip712Domain};
use serde::{Deserialize, Serialize};

sol! {
    /// Sequencer approval for an immediate withdrawal.
    #[derive(Debug, PartialEq, Eq)]
    struct VerifyWithdrawal {
        uint256 deadline;
        uint256 amount;
        uint256 nonce;
        address account;
    }

    /// Account-signed spend cap on one operator call.
    #[derive(Debug, PartialEq, Eq)]
    struct Action {
        uint256 maxAmount;
        address operator;
        bytes4 selector;
        bytes data;
    }

    /// Sequencer-signed outcome of an action.
    #[derive(Debug, PartialEq, Eq)]
    struct ActionAttestation {
        uint256 deadline;
        uint256 amount;
        uint256 nonce;
        address account;
        bytes32 callHash;
        bytes attestationData;
    }

    /// Bidder-signed sealed bid on an auction.
    #[derive(Debug, PartialEq, Eq)]
    struct Bid {
        bytes32 auctionId;
        uint256 maxAmount;
    }

    /// Sequencer-signed auction result.
    #[derive(Debug, PartialEq, Eq)]
    struct BidWinner {
        bytes32 auctionId;
        uint256 amount;
        address winner;
    }

    /// Seller-signed offer to mint a new piece at a minimum price.
    #[derive(Debug, PartialEq, Eq)]
    struct MintOffer {
        bytes32 mintHash;
        uint256 amount;
        uint256 deadline;
        uint256 counter;
        uint256 nonce;
    }

    /// Seller-signed open edition.
    #[derive(Debug, PartialEq, Eq)]
    struct SellOffer {
        address nftContract;
        string uri;
        uint256 cost;
        uint256 endDate;
        uint256 maxToMint;
        uint256 deadline;
        uint256 counter;
        uint256 nonce;
    }

    /// Sequencer approval of one buyer taking one `SellOffer`.
    #[derive(Debug, PartialEq, Eq)]
    struct MintOfferAttestation {
        uint256 deadline;
        bytes32 offerHash;
    }
}

/// Serializable EIP-712 domain descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl TypedDomain {
    /// Domain with the system name and version for `verifying_contract`.
    #[must_use]
    pub fn sealed_art_market(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: crate::constants::DOMAIN_NAME.to_string(),
            version: crate::constants::DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// The same domain bound to a different verifying contract.
    #[must_use]
    pub fn with_contract(&self, verifying_contract: Address) -> Self {
        Self {
            verifying_contract,
            ..self.clone()
        }
    }

    /// Convert to the alloy domain used for hashing.
    #[must_use]
    pub fn to_eip712(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

//! # sealedpool-operators
//!
//! **Execution plane**: the operators an attested action may call.
//!
//! Each operator implements [`sealedpool_types::Operator`] in two phases:
//! `prepare` validates the call and computes the payouts without touching
//! state, `commit` applies what `prepare` computed and cannot fail. The
//! settlement engine only commits once the ledger batch has been checked,
//! so a rejected action leaves operator state untouched.
//!
//! | Operator        | Selectors                              |
//! |-----------------|----------------------------------------|
//! | [`Auctions`]    | `settleAuction`, `settleAuctionLegacy` |
//! | [`MintAuctions`]| `mintWithOffer`                        |
//! | [`Editions`]    | `mintNew`, `mint`                      |
//!
//! Proceeds are split by [`OperatorRoles::split`]: the seller's share plus
//! a protocol fee credited to the operator's own account.

pub mod abi;
pub mod auctions;
pub mod delegate;
pub mod editions;
pub mod merkle;
pub mod mint_auctions;
pub mod nft;
pub mod roles;

pub use auctions::{Auction, Auctions, auction_id};
pub use delegate::{DelegateRegistry, NoDelegates, StaticDelegates};
pub use editions::{EditionRules, Editions, offer_hash};
pub use mint_auctions::{MintAuctions, OfferSigner, mint_hash};
pub use nft::NftLedger;
pub use roles::OperatorRoles;

#[cfg(test)]
fn execute<O: sealedpool_types::Operator>(
    op: &mut O,
    call: &sealedpool_types::OperatorCall,
) -> sealedpool_types::Result<sealedpool_types::Effect> {
    let prepared = op.prepare(call)?;
    let effect = prepared.effect.clone();
    op.commit(prepared);
    Ok(effect)
}

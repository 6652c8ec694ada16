//! In-memory NFT book kept by each operator.
//!
//! Tracks single-owner tokens (auctioned pieces, one-off mints) and
//! multi-holder edition balances, plus token URIs and the next id each
//! collection will assign.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use sealedpool_types::{Result, SealedPoolError};

/// Ownership and balances for every collection an operator touches.
#[derive(Debug, Default)]
pub struct NftLedger {
    owners: HashMap<(Address, U256), Address>,
    balances: HashMap<(Address, U256, Address), U256>,
    uris: HashMap<(Address, U256), String>,
    next_ids: HashMap<Address, U256>,
}

impl NftLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `collection` hand out `next` as its next token id.
    pub fn seed_next_id(&mut self, collection: Address, next: U256) {
        self.next_ids.insert(collection, next);
    }

    /// The id the next mint in `collection` will receive (ids start at 1).
    #[must_use]
    pub fn next_token_id(&self, collection: Address) -> U256 {
        self.next_ids
            .get(&collection)
            .copied()
            .unwrap_or(U256::from(1))
    }

    fn bump_next_id(&mut self, collection: Address, used: U256) {
        let next = used.saturating_add(U256::from(1));
        let entry = self.next_ids.entry(collection).or_insert(next);
        if *entry <= used {
            *entry = next;
        }
    }

    /// Give `to` the single-owner token `token_id`.
    pub fn mint_id(&mut self, collection: Address, to: Address, token_id: U256) {
        self.owners.insert((collection, token_id), to);
        self.bump_next_id(collection, token_id);
    }

    /// Mint single-owner token `token_id` to `to` with its metadata URI.
    pub fn mint_with_uri(&mut self, collection: Address, to: Address, token_id: U256, uri: &str) {
        self.mint_id(collection, to, token_id);
        self.uris.insert((collection, token_id), uri.to_owned());
    }

    /// Register edition token `token_id` with its metadata URI.
    pub fn create_edition(&mut self, collection: Address, token_id: U256, uri: &str) {
        self.uris.insert((collection, token_id), uri.to_owned());
        self.bump_next_id(collection, token_id);
    }

    /// Add `quantity` edition units to `to`.
    pub fn mint_edition(
        &mut self,
        collection: Address,
        token_id: U256,
        to: Address,
        quantity: U256,
    ) {
        let balance = self.balances.entry((collection, token_id, to)).or_default();
        *balance = balance.saturating_add(quantity);
    }

    #[must_use]
    pub fn owner_of(&self, collection: Address, token_id: U256) -> Option<Address> {
        self.owners.get(&(collection, token_id)).copied()
    }

    /// Edition balance of `holder`.
    #[must_use]
    pub fn balance_of(&self, collection: Address, token_id: U256, holder: Address) -> U256 {
        self.balances
            .get(&(collection, token_id, holder))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn uri(&self, collection: Address, token_id: U256) -> Option<&str> {
        self.uris.get(&(collection, token_id)).map(String::as_str)
    }

    /// Require that `from` owns the token.
    pub fn ensure_owner(&self, collection: Address, token_id: U256, from: Address) -> Result<()> {
        if self.owner_of(collection, token_id) == Some(from) {
            Ok(())
        } else {
            Err(SealedPoolError::unauthorized(format!(
                "{from} does not own token {token_id} of {collection}"
            )))
        }
    }

    /// Move a single-owner token.
    pub fn transfer(
        &mut self,
        collection: Address,
        token_id: U256,
        from: Address,
        to: Address,
    ) -> Result<()> {
        self.ensure_owner(collection, token_id, from)?;
        self.owners.insert((collection, token_id), to);
        Ok(())
    }
}

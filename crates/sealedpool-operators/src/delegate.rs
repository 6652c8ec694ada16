//! Delegation lookups.
//!
//! Sellers may let another key sign offers or edit edition rules on their
//! behalf. Where those delegations live is not the operators' concern, so
//! they only see this trait.

use std::collections::HashSet;

use alloy_primitives::Address;

/// Answers "may `delegate` act for `owner`?".
pub trait DelegateRegistry: Send + Sync {
    fn is_delegate(&self, owner: Address, delegate: Address) -> bool;
}

/// Registry that knows no delegations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelegates;

impl DelegateRegistry for NoDelegates {
    fn is_delegate(&self, _owner: Address, _delegate: Address) -> bool {
        false
    }
}

/// Fixed set of `(owner, delegate)` pairs.
#[derive(Debug, Default, Clone)]
pub struct StaticDelegates {
    pairs: HashSet<(Address, Address)>,
}

impl StaticDelegates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, owner: Address, delegate: Address) -> Self {
        self.pairs.insert((owner, delegate));
        self
    }
}

impl DelegateRegistry for StaticDelegates {
    fn is_delegate(&self, owner: Address, delegate: Address) -> bool {
        self.pairs.contains(&(owner, delegate))
    }
}

/// `actor` is `owner` or one of its delegates.
pub fn acts_for(registry: &dyn DelegateRegistry, owner: Address, actor: Address) -> bool {
    actor == owner || registry.is_delegate(owner, actor)
}

//! Operators known to the pool, keyed by address.
//!
//! An action can only reach an operator that was registered explicitly.
//! Concrete operator types stay reachable through [`OperatorRegistry::downcast`]
//! for seller and owner entry points that are not part of the trait.

use std::collections::HashMap;

use alloy_primitives::Address;
use sealedpool_types::{Operator, Result, SealedPoolError};

/// Registered operators.
#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<Address, Box<dyn Operator>>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.operators.iter().map(|(a, op)| (a, op.kind())))
            .finish()
    }
}

impl OperatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operator` under its own address.
    ///
    /// # Errors
    /// - `ZeroAddress` if the operator reports the zero address
    /// - `Configuration` if the address is already taken
    pub fn register(&mut self, operator: Box<dyn Operator>) -> Result<Address> {
        let address = operator.address();
        if address.is_zero() {
            return Err(SealedPoolError::ZeroAddress("operator"));
        }
        if self.operators.contains_key(&address) {
            return Err(SealedPoolError::Configuration(format!(
                "operator {address} already registered"
            )));
        }
        tracing::info!(operator = %address, kind = operator.kind(), "operator registered");
        self.operators.insert(address, operator);
        Ok(address)
    }

    pub fn get(&self, address: Address) -> Result<&dyn Operator> {
        self.operators
            .get(&address)
            .map(|op| &**op)
            .ok_or(SealedPoolError::UnknownOperator(address))
    }

    pub fn get_mut(&mut self, address: Address) -> Result<&mut (dyn Operator + 'static)> {
        self.operators
            .get_mut(&address)
            .map(|op| &mut **op)
            .ok_or(SealedPoolError::UnknownOperator(address))
    }

    /// The operator at `address` as its concrete type.
    ///
    /// # Errors
    /// `UnknownOperator` if nothing is registered there, `Configuration` if
    /// the operator is not a `T`.
    pub fn downcast<T: Operator + 'static>(&self, address: Address) -> Result<&T> {
        let operator = self.get(address)?;
        let kind = operator.kind();
        operator
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| wrong_kind(address, kind))
    }

    pub fn downcast_mut<T: Operator + 'static>(&mut self, address: Address) -> Result<&mut T> {
        let operator = self.get_mut(address)?;
        let kind = operator.kind();
        operator
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| wrong_kind(address, kind))
    }

    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.operators.contains_key(&address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

fn wrong_kind(address: Address, kind: &str) -> SealedPoolError {
    SealedPoolError::Configuration(format!("operator {address} is a {kind} operator"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealedpool_operators::{Auctions, Editions, NoDelegates, OperatorRoles};
    use std::sync::Arc;

    fn auctions(byte: u8) -> Auctions {
        let seq = Address::repeat_byte(1);
        Auctions::new(Address::repeat_byte(byte), seq, seq, 31_337).unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = OperatorRegistry::new();
        let addr = reg.register(Box::new(auctions(0xa0))).unwrap();
        assert_eq!(addr, Address::repeat_byte(0xa0));
        assert!(reg.contains(addr));
        assert_eq!(reg.get(addr).unwrap().kind(), "auctions");
        assert!(reg.downcast::<Auctions>(addr).is_ok());
    }

    #[test]
    fn duplicate_address_rejected() {
        let mut reg = OperatorRegistry::new();
        reg.register(Box::new(auctions(0xa0))).unwrap();
        let err = reg.register(Box::new(auctions(0xa0))).unwrap_err();
        assert!(matches!(err, SealedPoolError::Configuration(_)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn zero_address_rejected() {
        let mut reg = OperatorRegistry::new();
        let err = reg.register(Box::new(auctions(0x00))).unwrap_err();
        assert!(matches!(err, SealedPoolError::ZeroAddress("operator")));
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_operator() {
        let reg = OperatorRegistry::new();
        let addr = Address::repeat_byte(0x77);
        assert!(matches!(
            reg.get(addr),
            Err(SealedPoolError::UnknownOperator(a)) if a == addr
        ));
    }

    #[test]
    fn downcast_to_wrong_type_fails() {
        let mut reg = OperatorRegistry::new();
        let seq = Address::repeat_byte(1);
        let roles = OperatorRoles::new(Address::repeat_byte(0xed), seq, seq, 31_337).unwrap();
        let addr = reg
            .register(Box::new(Editions::new(roles, Arc::new(NoDelegates))))
            .unwrap();
        assert!(matches!(
            reg.downcast_mut::<Auctions>(addr),
            Err(SealedPoolError::Configuration(_))
        ));
        assert!(reg.downcast_mut::<Editions>(addr).is_ok());
    }
}

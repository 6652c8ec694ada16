//! Fixtures shared by tests across the workspace. **Never use in production.**

use alloy_primitives::{B256, U256};

/// One ether in wei.
#[must_use]
pub fn eth(whole: u64) -> U256 {
    U256::from(whole) * U256::from(1_000_000_000_000_000_000u128)
}

/// `tenths / 10` ether in wei.
#[must_use]
pub fn eth_tenths(tenths: u64) -> U256 {
    U256::from(tenths) * U256::from(100_000_000_000_000_000u128)
}

/// A random 32-byte salt.
#[must_use]
pub fn random_salt() -> B256 {
    B256::from(rand::random::<[u8; 32]>())
}

/// Salt with the low byte set to `n`, as the harness writes them (`0x…01`).
#[must_use]
pub fn salt(n: u8) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    B256::from(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_units() {
        assert_eq!(eth(1), eth_tenths(10));
        assert_eq!(eth(0), U256::ZERO);
    }

    #[test]
    fn salts_distinct() {
        assert_ne!(salt(1), salt(2));
        assert_ne!(random_salt(), random_salt());
    }
}

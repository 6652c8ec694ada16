//! Configuration for a SealedPool instance.

use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};

use crate::{constants, Result, SealedPoolError, TypedDomain};

/// Configuration for one pool instance.
///
/// The `(domain_name, domain_version, chain_id, pool_address)` quadruple forms
/// the EIP-712 domain; signers elsewhere must use exactly the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// EIP-712 domain name.
    pub domain_name: String,
    /// EIP-712 domain version.
    pub domain_version: String,
    /// Chain id baked into every signature.
    pub chain_id: u64,
    /// Address of this pool (the EIP-712 verifying contract).
    pub pool_address: Address,
    /// Address whose signatures authorise withdrawals and settlements.
    pub sequencer: Address,
    /// Address of the sealed funding factory.
    pub funding_factory: Address,
    /// Delay before a started withdrawal may execute, in seconds.
    pub withdrawal_delay_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            domain_name: constants::DOMAIN_NAME.to_string(),
            domain_version: constants::DOMAIN_VERSION.to_string(),
            chain_id: constants::DEFAULT_CHAIN_ID,
            pool_address: Address::ZERO,
            sequencer: Address::ZERO,
            funding_factory: Address::ZERO,
            withdrawal_delay_secs: constants::DEFAULT_WITHDRAWAL_DELAY_SECS,
        }
    }
}

impl PoolConfig {
    /// Build a config for the given pool and sequencer, defaults elsewhere.
    ///
    /// The factory address is derived from the pool address so two pools
    /// never share sealed funding addresses.
    #[must_use]
    pub fn new(pool_address: Address, sequencer: Address) -> Self {
        Self {
            pool_address,
            sequencer,
            funding_factory: pool_address
                .create2(B256::ZERO, keccak256(constants::SEALED_FUNDING_CODE_TAG)),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that could never verify a signature.
    pub fn validate(&self) -> Result<()> {
        if self.sequencer.is_zero() {
            return Err(SealedPoolError::ZeroAddress("sequencer"));
        }
        if self.pool_address.is_zero() {
            return Err(SealedPoolError::ZeroAddress("pool_address"));
        }
        if self.funding_factory.is_zero() {
            return Err(SealedPoolError::ZeroAddress("funding_factory"));
        }
        if self.domain_name.is_empty() || self.domain_version.is_empty() {
            return Err(SealedPoolError::Configuration(
                "domain name and version must be set".into(),
            ));
        }
        if self.withdrawal_delay_secs == 0 {
            return Err(SealedPoolError::Configuration(
                "withdrawal delay must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The EIP-712 domain of the pool itself.
    #[must_use]
    pub fn domain(&self) -> TypedDomain {
        TypedDomain {
            name: self.domain_name.clone(),
            version: self.domain_version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.pool_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    #[test]
    fn defaults() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.domain_name, "SealedArtMarket");
        assert_eq!(cfg.domain_version, "1");
        assert_eq!(cfg.chain_id, 31_337);
        assert_eq!(cfg.withdrawal_delay_secs, 7 * 24 * 3600);
    }

    #[test]
    fn zero_sequencer_rejected() {
        let cfg = PoolConfig::new(addr(1), Address::ZERO);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, SealedPoolError::ZeroAddress("sequencer")));
    }

    #[test]
    fn valid_config_passes() {
        let cfg = PoolConfig::new(addr(1), addr(2));
        cfg.validate().unwrap();
        assert_ne!(cfg.funding_factory, Address::ZERO);
        assert_eq!(cfg.domain().verifying_contract, addr(1));
    }

    #[test]
    fn json_roundtrip_and_partial_json() {
        let cfg = PoolConfig::new(addr(1), addr(2));
        let json = serde_json::to_string(&cfg).unwrap();
        let back = PoolConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);

        let partial = format!(
            r#"{{"pool_address":"{}","sequencer":"{}","funding_factory":"{}","chain_id":1}}"#,
            addr(1),
            addr(2),
            addr(3)
        );
        let parsed = PoolConfig::from_json_str(&partial).unwrap();
        assert_eq!(parsed.chain_id, 1);
        assert_eq!(parsed.domain_name, "SealedArtMarket");
    }

    #[test]
    fn bad_json_is_serialization_error() {
        let err = PoolConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, SealedPoolError::Serialization(_)));
    }
}

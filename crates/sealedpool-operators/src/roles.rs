//! Roles and protocol fees shared by every operator.

use alloy_primitives::{Address, U256};
use sealedpool_types::{
    Payout, Result, SealedPoolError, SignatureVerifier, TypedDomain,
    constants::{BPS_DENOMINATOR, DEFAULT_PROTOCOL_FEE_BPS, MAX_PROTOCOL_FEE_BPS},
};

/// Owner, sequencer and fee settings of one operator.
#[derive(Debug, Clone)]
pub struct OperatorRoles {
    address: Address,
    owner: Address,
    sequencer: Address,
    fee_bps: u64,
    verifier: SignatureVerifier,
}

impl OperatorRoles {
    /// Roles for the operator at `address`, signing under its own domain.
    ///
    /// # Errors
    /// Returns `ZeroAddress` if `sequencer` or `owner` is zero.
    pub fn new(
        address: Address,
        owner: Address,
        sequencer: Address,
        chain_id: u64,
    ) -> Result<Self> {
        if sequencer.is_zero() {
            return Err(SealedPoolError::ZeroAddress("sequencer"));
        }
        if owner.is_zero() {
            return Err(SealedPoolError::ZeroAddress("owner"));
        }
        Ok(Self {
            address,
            owner,
            sequencer,
            fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            verifier: SignatureVerifier::new(TypedDomain::sealed_art_market(chain_id, address)),
        })
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn sequencer(&self) -> Address {
        self.sequencer
    }

    #[must_use]
    pub fn fee_bps(&self) -> u64 {
        self.fee_bps
    }

    /// Verifier bound to this operator's domain.
    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// The operator's EIP-712 domain.
    #[must_use]
    pub fn domain(&self) -> &TypedDomain {
        self.verifier.domain()
    }

    pub fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(SealedPoolError::unauthorized("caller is not the owner"))
        }
    }

    #[must_use]
    pub fn is_owner(&self, caller: Address) -> bool {
        caller == self.owner
    }

    /// Owner-only.
    pub fn set_sequencer(&mut self, caller: Address, sequencer: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if sequencer.is_zero() {
            return Err(SealedPoolError::ZeroAddress("sequencer"));
        }
        tracing::info!(
            operator = %self.address,
            old = %self.sequencer,
            new = %sequencer,
            "sequencer changed"
        );
        self.sequencer = sequencer;
        Ok(())
    }

    /// Owner-only; capped at `MAX_PROTOCOL_FEE_BPS`.
    pub fn set_protocol_fee(&mut self, caller: Address, fee_bps: u64) -> Result<()> {
        self.ensure_owner(caller)?;
        if fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(SealedPoolError::limit(">MAX_PROTOCOL_FEE"));
        }
        self.fee_bps = fee_bps;
        Ok(())
    }

    /// Owner-only.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(SealedPoolError::ZeroAddress("owner"));
        }
        self.owner = new_owner;
        Ok(())
    }

    /// Protocol fee on `amount`, rounded down.
    #[must_use]
    pub fn fee_on(&self, amount: U256) -> U256 {
        // Divide first if the product would overflow.
        let bps = U256::from(self.fee_bps);
        let denom = U256::from(BPS_DENOMINATOR);
        amount
            .checked_mul(bps)
            .map_or_else(|| amount / denom * bps, |scaled| scaled / denom)
    }

    /// Pay `amount` to `seller` minus the protocol fee, which goes to the
    /// operator's own account. Zero legs are omitted.
    #[must_use]
    pub fn split(&self, seller: Address, amount: U256) -> Vec<Payout> {
        let fee = self.fee_on(amount);
        [
            Payout {
                to: seller,
                amount: amount - fee,
            },
            Payout {
                to: self.address,
                amount: fee,
            },
        ]
        .into_iter()
        .filter(|p| !p.amount.is_zero())
        .collect()
    }
}

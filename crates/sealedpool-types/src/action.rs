//! Signed request envelopes accepted by the pool.
//!
//! Each envelope pairs a typed-data payload with its `(v, r, s)` signature.
//! The `typed()` accessors rebuild the exact struct that was signed.

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::typed_data::{Action, ActionAttestation, VerifyWithdrawal};
use crate::SignatureParts;

/// `keccak256(abi.encode(operator, data))`: binds an attestation to one call.
#[must_use]
pub fn call_hash(operator: Address, data: &Bytes) -> B256 {
    keccak256((operator, data.clone()).abi_encode_params())
}

/// Sequencer-signed permission to withdraw immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedWithdrawal {
    pub deadline: U256,
    pub amount: U256,
    pub nonce: U256,
    pub account: Address,
    pub signature: SignatureParts,
}

impl SignedWithdrawal {
    /// The typed struct the sequencer signed.
    #[must_use]
    pub fn typed(&self) -> VerifyWithdrawal {
        VerifyWithdrawal {
            deadline: self.deadline,
            amount: self.amount,
            nonce: self.nonce,
            account: self.account,
        }
    }
}

/// Account-signed cap on what one operator call may charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub max_amount: U256,
    pub operator: Address,
    pub selector: FixedBytes<4>,
    pub data: Bytes,
    pub signature: SignatureParts,
}

impl ActionEnvelope {
    /// The typed struct the account signed.
    #[must_use]
    pub fn typed(&self) -> Action {
        Action {
            maxAmount: self.max_amount,
            operator: self.operator,
            selector: self.selector,
            data: self.data.clone(),
        }
    }

    /// Hash binding this envelope's call to an attestation.
    #[must_use]
    pub fn call_hash(&self) -> B256 {
        call_hash(self.operator, &self.data)
    }
}

/// Sequencer-signed exact outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedActionAttestation {
    pub deadline: U256,
    pub amount: U256,
    pub nonce: U256,
    pub account: Address,
    pub call_hash: B256,
    pub attestation_data: Bytes,
    pub signature: SignatureParts,
}

impl SignedActionAttestation {
    /// The typed struct the sequencer signed.
    #[must_use]
    pub fn typed(&self) -> ActionAttestation {
        ActionAttestation {
            deadline: self.deadline,
            amount: self.amount,
            nonce: self.nonce,
            account: self.account,
            callHash: self.call_hash,
            attestationData: self.attestation_data.clone(),
        }
    }
}

/// Returns `Err(Expired)` if `deadline` is before `now`.
pub fn ensure_not_expired(deadline: U256, now: u64) -> crate::Result<()> {
    if deadline < U256::from(now) {
        return Err(crate::SealedPoolError::Expired { deadline, now });
    }
    Ok(())
}

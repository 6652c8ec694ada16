//! Error types for the SealedPool escrow ledger.
//!
//! All errors use the `SP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Signature / attestation errors
//! - 2xx: Balance errors
//! - 3xx: Withdrawal / replay errors
//! - 4xx: Settlement errors
//! - 5xx: Sealed funding errors
//! - 6xx: Operator errors
//! - 9xx: General / internal errors

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Central error enum for all SealedPool operations.
///
/// Every variant is terminal for the request that produced it: the core never
/// retries, and a failed request leaves no partial state behind.
#[derive(Debug, Error)]
pub enum SealedPoolError {
    // =================================================================
    // Signature / Attestation Errors (1xx)
    // =================================================================
    /// The recovered signer did not match the expected address, or the
    /// signature was malformed.
    #[error("SP_ERR_100: Invalid signature")]
    InvalidSignature,

    /// The attestation or offer deadline has passed.
    #[error("SP_ERR_101: Expired: deadline {deadline} < now {now}")]
    Expired { deadline: U256, now: u64 },

    /// The attestation does not bind to the submitted operator call.
    #[error("SP_ERR_102: Call hash mismatch")]
    CallHashMismatch,

    /// The offer's counter is not the seller's current counter.
    #[error("SP_ERR_103: Stale counter: offer has {offered}, current is {current}")]
    StaleCounter { offered: U256, current: U256 },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Debit would take the balance below zero.
    #[error("SP_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: U256, available: U256 },

    /// Credit would overflow the 256-bit balance.
    #[error("SP_ERR_201: Balance overflow")]
    BalanceOverflow,

    /// A checked counter increment overflowed (sold-out / stopped signal).
    #[error("SP_ERR_202: Arithmetic overflow")]
    ArithmeticOverflow,

    // =================================================================
    // Withdrawal / Replay Errors (3xx)
    // =================================================================
    /// The caller is not the account named in the attestation.
    #[error("SP_ERR_300: Not sender: caller {caller}, account {account}")]
    NotSender { caller: Address, account: Address },

    /// The `(account, nonce)` pair was already consumed.
    #[error("SP_ERR_301: Replayed nonce {nonce} for {account}")]
    Replayed { account: Address, nonce: U256 },

    /// The withdrawal delay has not elapsed yet.
    #[error("SP_ERR_302: Too soon: ready after {ready_at}, now {now}")]
    TooSoon { ready_at: u64, now: u64 },

    // =================================================================
    // Settlement Errors (4xx)
    // =================================================================
    /// The sequencer attested a larger spend than the account authorised.
    #[error("SP_ERR_400: Amount {amount} exceeds signed max {max_amount}")]
    AmountExceedsMax { amount: U256, max_amount: U256 },

    /// No operator is registered at this address.
    #[error("SP_ERR_401: Unknown operator: {0}")]
    UnknownOperator(Address),

    /// The operator does not expose the requested selector.
    #[error("SP_ERR_402: Unknown selector 0x{selector} for operator {operator}")]
    UnknownSelector { operator: Address, selector: String },

    /// The operator's payouts exceed the settled amount.
    #[error("SP_ERR_403: Payouts {payouts} exceed settled amount {amount}")]
    PayoutsExceedAmount { payouts: U256, amount: U256 },

    // =================================================================
    // Sealed Funding Errors (5xx)
    // =================================================================
    /// The sealed funding address was already swept; it accepts nothing more.
    #[error("SP_ERR_500: Sealed funding already deployed at {0}")]
    SealedFundingDeployed(Address),

    // =================================================================
    // Operator Errors (6xx)
    // =================================================================
    /// Role or ownership check failed.
    #[error("SP_ERR_600: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// A configured limit would be exceeded (`>maxToMint`, `>maxPerWallet`, ...).
    #[error("SP_ERR_601: Limit exceeded: {limit}")]
    LimitExceeded { limit: String },

    /// Merkle allowlist proof did not verify.
    #[error("SP_ERR_602: Bad allowlist proof")]
    BadProof,

    /// Attached value does not match the price.
    #[error("SP_ERR_603: Value mismatch: expected {expected}, got {actual}")]
    ValueMismatch { expected: U256, actual: U256 },

    /// The zero address was supplied where a real signer is required.
    #[error("SP_ERR_604: Zero address not allowed for {0}")]
    ZeroAddress(&'static str),

    /// Operator-specific rejection.
    #[error("SP_ERR_605: Operator rejected call: {reason}")]
    OperatorRejected { reason: String },

    /// Operator call data or attestation data failed to ABI-decode.
    #[error("SP_ERR_606: Decode error: {0}")]
    Decode(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical safety alert.
    #[error("SP_ERR_900: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("SP_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("SP_ERR_902: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("SP_ERR_903: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SealedPoolError>;

impl From<serde_json::Error> for SealedPoolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<alloy_sol_types::Error> for SealedPoolError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl SealedPoolError {
    /// Shorthand for [`SealedPoolError::LimitExceeded`].
    pub fn limit(limit: impl Into<String>) -> Self {
        Self::LimitExceeded {
            limit: limit.into(),
        }
    }

    /// Shorthand for [`SealedPoolError::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SealedPoolError::OperatorRejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::OperatorRejected {
            reason: reason.into(),
        }
    }
}

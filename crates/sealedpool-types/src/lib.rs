//! # sealedpool-types
//!
//! Shared types, errors, and configuration for the **SealedPool** escrow ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Typed data**: EIP-712 schemas ([`VerifyWithdrawal`], [`Action`],
//!   [`ActionAttestation`], [`Bid`], [`BidWinner`], [`MintOffer`],
//!   [`SellOffer`], [`MintOfferAttestation`]) and [`TypedDomain`]
//! - **Signatures**: [`SignatureParts`], [`SignatureVerifier`]
//! - **Envelopes**: [`SignedWithdrawal`], [`ActionEnvelope`], [`SignedActionAttestation`]
//! - **Withdrawals**: [`WithdrawalKey`], [`WithdrawalHandle`]
//! - **Operators**: [`Operator`], [`OperatorCall`], [`Effect`], [`Payout`], [`NftEffect`]
//! - **Receipts**: [`Receipt`], [`ReceiptKind`]
//! - **Configuration**: [`PoolConfig`], [`Clock`]
//! - **Errors**: [`SealedPoolError`] with `SP_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod action;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod operator;
pub mod receipt;
pub mod signature;
pub mod typed_data;
pub mod withdrawal;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use action::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use operator::*;
pub use receipt::*;
pub use signature::*;
pub use typed_data::*;
pub use withdrawal::*;

// EVM primitives used throughout the public API.
pub use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256, keccak256};

// Constants are accessed via `sealedpool_types::constants::FOO`
// (not re-exported to avoid name collisions).

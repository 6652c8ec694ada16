//! # sealedpool-settlement
//!
//! **Settlement plane**: verifies sequencer attestations and moves escrowed
//! value through operators.
//!
//! ## Architecture
//!
//! [`SealedPool`] is the entry point. It owns:
//! 1. **SettlementEngine**: ledger, replay guard and operator registry;
//!    settles attested actions and legacy auctions atomically
//! 2. **PendingWithdrawals**: the delayed exit queue
//! 3. **SealedFundingFactory**: sealed bid commitments swept on settlement
//! 4. **ReceiptJournal**: one receipt per committed transition
//!
//! ## Concurrency
//!
//! The pool takes `&mut self` for every mutation. [`SharedPool`] puts it
//! behind one mutex so concurrent submissions of the same attestation settle
//! exactly once.

pub mod engine;
pub mod pool;
pub mod registry;

pub use engine::{
    ActionRequest, DirectRequest, LegacyAuctionRequest, Settlement, SettlementEngine,
};
pub use pool::{SealedPool, SharedPool};
pub use registry::OperatorRegistry;

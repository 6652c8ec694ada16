//! # sealedpool-ledger
//!
//! **Custody plane**: the escrow balance ledger and everything that guards it.
//!
//! ## Architecture
//!
//! 1. **EscrowLedger**: per-account balances with checked arithmetic and
//!    validate-then-apply [`LedgerBatch`]es
//! 2. **ReplayGuard**: consumed `(account, nonce)` pairs
//! 3. **PendingWithdrawals**: the delayed, signature-free exit queue
//! 4. **SealedFundingFactory**: deterministic commit addresses swept once
//! 5. **SupplyConservation**: Σ balances == deposits − withdrawals
//! 6. **ReceiptJournal**: hash-chained audit trail of committed transitions
//!
//! ## Mutation discipline
//!
//! ```text
//! verify signatures → ReplayGuard::check → EscrowLedger::check(batch)
//!     → (nothing has changed yet) → EscrowLedger::apply(batch) + ReplayGuard::consume
//! ```
//!
//! Every fallible check runs before the first mutation.

pub mod escrow_ledger;
pub mod pending_withdrawals;
pub mod receipt_journal;
pub mod replay_guard;
pub mod sealed_funding;
pub mod supply_conservation;

pub use escrow_ledger::{EscrowLedger, LedgerBatch};
pub use pending_withdrawals::PendingWithdrawals;
pub use receipt_journal::ReceiptJournal;
pub use replay_guard::ReplayGuard;
pub use sealed_funding::{SealedFundingFactory, SweepPlan};
pub use supply_conservation::SupplyConservation;

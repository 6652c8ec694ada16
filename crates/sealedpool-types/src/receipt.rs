//! Receipt types for the SealedPool audit trail.
//!
//! Every committed state transition (deposit, withdrawal, sweep, settlement)
//! produces a [`Receipt`]. Receipts are hash-chained: each one commits to the
//! hash of its predecessor, so the journal can be replayed and checked.

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Unique receipt identifier. UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt:{}", self.0)
    }
}

/// The kind of transition a receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// Value credited to an account from outside the pool.
    Deposit,
    /// Signed immediate withdrawal paid out.
    Withdrawal,
    /// Delayed withdrawal recorded (carries the start timestamp).
    WithdrawalStarted,
    /// Delayed withdrawal paid out (possibly zero).
    WithdrawalExecuted,
    /// A sealed funding address was swept into the ledger.
    SealedFundingSwept,
    /// An attested action was settled through an operator.
    ActionSettled,
    /// A legacy auction settlement completed.
    AuctionSettled,
    /// An operator's accrued fees were paid to its owner.
    FeesCollected,
}

impl fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::WithdrawalStarted => write!(f, "WITHDRAWAL_STARTED"),
            Self::WithdrawalExecuted => write!(f, "WITHDRAWAL_EXECUTED"),
            Self::SealedFundingSwept => write!(f, "SEALED_FUNDING_SWEPT"),
            Self::ActionSettled => write!(f, "ACTION_SETTLED"),
            Self::AuctionSettled => write!(f, "AUCTION_SETTLED"),
            Self::FeesCollected => write!(f, "FEES_COLLECTED"),
        }
    }
}

/// One entry of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub kind: ReceiptKind,
    /// The account whose balance (or pending state) changed.
    pub account: Address,
    pub amount: U256,
    /// Nonce, salt or call hash the transition consumed, if any.
    pub reference: Option<B256>,
    /// Unix seconds from the pool clock.
    pub timestamp: u64,
    /// Human-readable form of `timestamp`.
    pub recorded_at: DateTime<Utc>,
    /// Hash of the previous receipt (zero for the first one).
    pub prev_hash: [u8; 32],
    /// SHA-256 over this receipt's fields and `prev_hash`.
    pub hash: [u8; 32],
}

impl Receipt {
    /// Build a receipt chained onto `prev_hash`.
    #[must_use]
    pub fn new(
        kind: ReceiptKind,
        account: Address,
        amount: U256,
        reference: Option<B256>,
        timestamp: u64,
        prev_hash: [u8; 32],
    ) -> Self {
        let recorded_at = i64::try_from(timestamp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default();
        let mut receipt = Self {
            id: ReceiptId::new(),
            kind,
            account,
            amount,
            reference,
            timestamp,
            recorded_at,
            prev_hash,
            hash: [0u8; 32],
        };
        receipt.hash = receipt.compute_hash();
        receipt
    }

    /// Recompute the chained hash from the receipt's fields.
    #[must_use]
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"sealedpool:receipt:v1:");
        hasher.update(self.id.0.as_bytes());
        hasher.update(self.kind.to_string().as_bytes());
        hasher.update(self.account.as_slice());
        hasher.update(self.amount.to_be_bytes::<32>());
        if let Some(reference) = self.reference {
            hasher.update(reference.as_slice());
        }
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.prev_hash);
        hasher.finalize().into()
    }

    /// Short hex prefix of the hash, for logs.
    #[must_use]
    pub fn short_hash(&self) -> String {
        hex::encode(&self.hash[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_kind_display() {
        assert_eq!(format!("{}", ReceiptKind::Deposit), "DEPOSIT");
        assert_eq!(
            format!("{}", ReceiptKind::WithdrawalStarted),
            "WITHDRAWAL_STARTED"
        );
    }

    #[test]
    fn hash_commits_to_fields() {
        let r = Receipt::new(
            ReceiptKind::Deposit,
            Address::repeat_byte(1),
            U256::from(10),
            None,
            1_700_000_000,
            [0u8; 32],
        );
        assert_eq!(r.hash, r.compute_hash());
        let mut tampered = r.clone();
        tampered.amount = U256::from(11);
        assert_ne!(tampered.compute_hash(), r.hash);
    }

    #[test]
    fn recorded_at_matches_timestamp() {
        let r = Receipt::new(
            ReceiptKind::Withdrawal,
            Address::ZERO,
            U256::ZERO,
            None,
            86_400,
            [0u8; 32],
        );
        assert_eq!(r.recorded_at.timestamp(), 86_400);
    }

    #[test]
    fn serde_roundtrip() {
        let r = Receipt::new(
            ReceiptKind::ActionSettled,
            Address::repeat_byte(3),
            U256::from(7),
            Some(B256::repeat_byte(9)),
            5,
            [1u8; 32],
        );
        let json = serde_json::to_string(&r).unwrap();
        let back: Receipt = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}

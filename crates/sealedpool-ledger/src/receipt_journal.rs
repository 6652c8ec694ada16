//! Append-only, hash-chained receipt journal.

use alloy_primitives::{Address, B256, U256};
use sealedpool_types::{Receipt, ReceiptKind, Result, SealedPoolError};

/// Every committed transition, in commit order.
#[derive(Debug, Default)]
pub struct ReceiptJournal {
    receipts: Vec<Receipt>,
}

impl ReceiptJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a receipt chained onto the previous one.
    pub fn append(
        &mut self,
        kind: ReceiptKind,
        account: Address,
        amount: U256,
        reference: Option<B256>,
        timestamp: u64,
    ) -> &Receipt {
        let receipt = Receipt::new(
            kind,
            account,
            amount,
            reference,
            timestamp,
            self.last_hash(),
        );
        tracing::debug!(
            receipt_id = %receipt.id,
            kind = %kind,
            account = %account,
            amount = %amount,
            hash = %receipt.short_hash(),
            "receipt appended"
        );
        self.receipts.push(receipt);
        &self.receipts[self.receipts.len() - 1]
    }

    /// Hash of the newest receipt, zero when empty.
    #[must_use]
    pub fn last_hash(&self) -> [u8; 32] {
        self.receipts.last().map(|r| r.hash).unwrap_or_default()
    }

    /// Check that every receipt hashes correctly and links to its predecessor.
    ///
    /// # Errors
    /// Returns [`SealedPoolError::Internal`] naming the first broken link.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = [0u8; 32];
        for (index, receipt) in self.receipts.iter().enumerate() {
            if receipt.prev_hash != prev {
                return Err(SealedPoolError::Internal(format!(
                    "receipt {index} links to {} instead of {}",
                    hex::encode(receipt.prev_hash),
                    hex::encode(prev)
                )));
            }
            if receipt.compute_hash() != receipt.hash {
                return Err(SealedPoolError::Internal(format!(
                    "receipt {index} ({}) hash mismatch",
                    receipt.id
                )));
            }
            prev = receipt.hash;
        }
        Ok(())
    }

    #[must_use]
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Receipts touching `account`.
    pub fn for_account(&self, account: Address) -> impl Iterator<Item = &Receipt> {
        self.receipts.iter().filter(move |r| r.account == account)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_links_receipts() {
        let mut journal = ReceiptJournal::new();
        journal.append(
            ReceiptKind::Deposit,
            Address::repeat_byte(1),
            U256::from(5),
            None,
            10,
        );
        let first_hash = journal.last_hash();
        let second = journal.append(
            ReceiptKind::Withdrawal,
            Address::repeat_byte(1),
            U256::from(2),
            Some(B256::repeat_byte(7)),
            11,
        );
        assert_eq!(second.prev_hash, first_hash);
        assert_eq!(journal.len(), 2);
        journal.verify_chain().unwrap();
    }

    #[test]
    fn tampering_detected() {
        let mut journal = ReceiptJournal::new();
        for i in 0..3u64 {
            journal.append(
                ReceiptKind::Deposit,
                Address::repeat_byte(1),
                U256::from(i),
                None,
                i,
            );
        }
        journal.receipts[1].amount = U256::from(99);
        let err = journal.verify_chain().unwrap_err();
        assert!(err.to_string().contains("receipt 1"));
    }

    #[test]
    fn filter_by_account() {
        let mut journal = ReceiptJournal::new();
        journal.append(ReceiptKind::Deposit, Address::repeat_byte(1), U256::from(1), None, 0);
        journal.append(ReceiptKind::Deposit, Address::repeat_byte(2), U256::from(1), None, 0);
        assert_eq!(journal.for_account(Address::repeat_byte(2)).count(), 1);
    }
}

//! Sorted-pair keccak Merkle proofs for edition allowlists.

use alloy_primitives::{Address, B256, keccak256};
use alloy_sol_types::SolValue;

/// Allowlist leaf for `account`: `keccak256(abi.encode(account))`.
#[must_use]
pub fn leaf(account: Address) -> B256 {
    keccak256(account.abi_encode())
}

fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Fold `proof` over `leaf` and compare with `root`.
#[must_use]
pub fn verify(proof: &[B256], root: B256, leaf: B256) -> bool {
    proof.iter().fold(leaf, |node, sibling| hash_pair(node, *sibling)) == root
}

/// Root and per-leaf proofs for a small tree. Odd nodes are promoted.
#[cfg(test)]
pub(crate) fn build(leaves: &[B256]) -> (B256, Vec<Vec<B256>>) {
    let mut proofs = vec![Vec::new(); leaves.len()];
    let mut positions: Vec<usize> = (0..leaves.len()).collect();
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            next.push(if pair.len() == 2 {
                hash_pair(pair[0], pair[1])
            } else {
                pair[0]
            });
        }
        for (i, pos) in positions.iter_mut().enumerate() {
            let sibling = *pos ^ 1;
            if sibling < level.len() {
                proofs[i].push(level[sibling]);
            }
            *pos /= 2;
        }
        level = next;
    }
    (level.first().copied().unwrap_or_default(), proofs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_member_proves() {
        let leaves: Vec<B256> = (1..=5u8).map(|b| leaf(Address::repeat_byte(b))).collect();
        let (root, proofs) = build(&leaves);
        for (l, p) in leaves.iter().zip(&proofs) {
            assert!(verify(p, root, *l));
        }
    }

    #[test]
    fn outsider_fails() {
        let leaves: Vec<B256> = (1..=4u8).map(|b| leaf(Address::repeat_byte(b))).collect();
        let (root, proofs) = build(&leaves);
        assert!(!verify(&proofs[0], root, leaf(Address::repeat_byte(9))));
    }

    #[test]
    fn single_leaf_root_is_leaf() {
        let l = leaf(Address::repeat_byte(1));
        let (root, proofs) = build(&[l]);
        assert_eq!(root, l);
        assert!(verify(&proofs[0], root, l));
    }
}

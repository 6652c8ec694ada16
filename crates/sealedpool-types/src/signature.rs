//! EIP-712 signature verification.
//!
//! Signatures travel as `(v, r, s)` triples, exactly as wallets split them.
//! Verification hashes the typed value under a [`TypedDomain`], recovers the
//! secp256k1 signer and compares it with the expected address. Every failure
//! mode (wrong signer, malformed `v`, zero or out-of-range scalars) maps to
//! [`SealedPoolError::InvalidSignature`]; nothing here panics.

use alloy_primitives::{Address, Signature, B256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};

use crate::{Result, SealedPoolError, TypedDomain};

/// A split ECDSA signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureParts {
    /// Recovery id, either `0/1` or the legacy `27/28`.
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl SignatureParts {
    /// Convert to an alloy signature.
    ///
    /// # Errors
    /// `InvalidSignature` for any `v` outside `{0, 1, 27, 28}`.
    pub fn to_signature(&self) -> Result<Signature> {
        let parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            _ => return Err(SealedPoolError::InvalidSignature),
        };
        Ok(Signature::from_scalars_and_parity(self.r, self.s, parity))
    }

    /// Split an alloy signature into wallet-style parts (`v` in `27/28`).
    #[must_use]
    pub fn from_signature(signature: &Signature) -> Self {
        Self {
            v: 27 + u8::from(signature.v()),
            r: B256::from(signature.r()),
            s: B256::from(signature.s()),
        }
    }
}

/// Verifies typed-data signatures for one EIP-712 domain.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    domain: TypedDomain,
    eip712: Eip712Domain,
}

impl SignatureVerifier {
    /// Create a verifier bound to `domain`.
    #[must_use]
    pub fn new(domain: TypedDomain) -> Self {
        let eip712 = domain.to_eip712();
        Self { domain, eip712 }
    }

    /// The domain this verifier hashes under.
    #[must_use]
    pub fn domain(&self) -> &TypedDomain {
        &self.domain
    }

    /// The EIP-712 signing digest of `value`.
    #[must_use]
    pub fn digest<T: SolStruct>(&self, value: &T) -> B256 {
        value.eip712_signing_hash(&self.eip712)
    }

    /// Recover the address that signed `value`.
    pub fn recover<T: SolStruct>(&self, value: &T, signature: &SignatureParts) -> Result<Address> {
        let digest = self.digest(value);
        signature
            .to_signature()?
            .recover_address_from_prehash(&digest)
            .map_err(|_| SealedPoolError::InvalidSignature)
    }

    /// Require that `value` was signed by `expected`.
    ///
    /// # Errors
    /// `InvalidSignature` if recovery fails, the signer differs, or
    /// `expected` is the zero address.
    pub fn verify<T: SolStruct>(
        &self,
        value: &T,
        signature: &SignatureParts,
        expected: Address,
    ) -> Result<()> {
        if expected.is_zero() {
            return Err(SealedPoolError::InvalidSignature);
        }
        let recovered = self.recover(value, signature)?;
        if recovered != expected {
            tracing::debug!(
                %recovered,
                %expected,
                verifying_contract = %self.domain.verifying_contract,
                "Signer mismatch"
            );
            return Err(SealedPoolError::InvalidSignature);
        }
        Ok(())
    }
}

/// Deterministic local signer for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct TestSigner {
    inner: alloy_signer_local::PrivateKeySigner,
}

#[cfg(any(test, feature = "test-helpers"))]
impl TestSigner {
    /// Signer whose private key is `seed` repeated 32 times. `seed` must be non-zero.
    pub fn from_seed(seed: u8) -> Self {
        let inner = alloy_signer_local::PrivateKeySigner::from_bytes(&B256::repeat_byte(seed))
            .expect("repeated non-zero byte is a valid secp256k1 key");
        Self { inner }
    }

    /// Freshly generated random signer.
    pub fn random() -> Self {
        Self {
            inner: alloy_signer_local::PrivateKeySigner::random(),
        }
    }

    /// The signer's address.
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Sign `value` under `domain`.
    pub fn sign<T: SolStruct>(&self, value: &T, domain: &TypedDomain) -> SignatureParts {
        use alloy_signer::SignerSync;
        let digest = value.eip712_signing_hash(&domain.to_eip712());
        let signature = self
            .inner
            .sign_hash_sync(&digest)
            .expect("local signing cannot fail");
        SignatureParts::from_signature(&signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_data::VerifyWithdrawal;
    use alloy_primitives::U256;

    fn domain() -> TypedDomain {
        TypedDomain::sealed_art_market(31_337, Address::repeat_byte(0xaa))
    }

    fn value(account: Address) -> VerifyWithdrawal {
        VerifyWithdrawal {
            deadline: U256::from(1_000),
            amount: U256::from(5),
            nonce: U256::from(69),
            account,
        }
    }

    #[test]
    fn valid_signature_recovers_signer() {
        let signer = TestSigner::from_seed(1);
        let v = value(Address::repeat_byte(2));
        let sig = signer.sign(&v, &domain());
        let verifier = SignatureVerifier::new(domain());
        assert_eq!(verifier.recover(&v, &sig).unwrap(), signer.address());
        verifier.verify(&v, &sig, signer.address()).unwrap();
    }

    #[test]
    fn wrong_signer_rejected() {
        let signer = TestSigner::from_seed(1);
        let other = TestSigner::from_seed(2);
        let v = value(Address::repeat_byte(2));
        let sig = signer.sign(&v, &domain());
        let err = SignatureVerifier::new(domain())
            .verify(&v, &sig, other.address())
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::InvalidSignature));
    }

    #[test]
    fn tampered_value_rejected() {
        let signer = TestSigner::from_seed(1);
        let mut v = value(Address::repeat_byte(2));
        let sig = signer.sign(&v, &domain());
        v.amount = U256::from(6);
        let err = SignatureVerifier::new(domain())
            .verify(&v, &sig, signer.address())
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::InvalidSignature));
    }

    #[test]
    fn other_domain_rejected() {
        let signer = TestSigner::from_seed(1);
        let v = value(Address::repeat_byte(2));
        let sig = signer.sign(&v, &domain().with_contract(Address::repeat_byte(0xbb)));
        let err = SignatureVerifier::new(domain())
            .verify(&v, &sig, signer.address())
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::InvalidSignature));
    }

    #[test]
    fn zero_signature_rejected_without_panic() {
        let v = value(Address::repeat_byte(2));
        let err = SignatureVerifier::new(domain())
            .verify(&v, &SignatureParts::default(), Address::repeat_byte(3))
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::InvalidSignature));
    }

    #[test]
    fn malformed_v_rejected() {
        let signer = TestSigner::from_seed(1);
        let v = value(Address::repeat_byte(2));
        let mut sig = signer.sign(&v, &domain());
        sig.v = 5;
        let err = SignatureVerifier::new(domain())
            .verify(&v, &sig, signer.address())
            .unwrap_err();
        assert!(matches!(err, SealedPoolError::InvalidSignature));
    }

    #[test]
    fn legacy_and_raw_v_equivalent() {
        let signer = TestSigner::from_seed(4);
        let v = value(Address::repeat_byte(2));
        let mut sig = signer.sign(&v, &domain());
        sig.v -= 27;
        SignatureVerifier::new(domain())
            .verify(&v, &sig, signer.address())
            .unwrap();
    }

    #[test]
    fn zero_expected_never_verifies() {
        let signer = TestSigner::from_seed(1);
        let v = value(Address::repeat_byte(2));
        let sig = signer.sign(&v, &domain());
        assert!(SignatureVerifier::new(domain())
            .verify(&v, &sig, Address::ZERO)
            .is_err());
    }
}

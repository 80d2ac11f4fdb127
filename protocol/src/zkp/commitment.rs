//! # Commitment Encoder
//!
//! A commitment binds an assessment to its private value without revealing
//! it:
//!
//! ```text
//! commitment = MiMC7_k(value)        k = hash_to_field_in(COMMITMENT_DOMAIN, "key")
//! ```
//!
//! rendered as a 32-byte big-endian hex digest. The circuit recomputes the
//! same MiMC-7 evaluation over the private witness and constrains it to the
//! public commitment signal. Both sides call the same [`super::mimc`]
//! type, so encoder and circuit cannot disagree.
//!
//! The encoder is a pure function: no randomness, no state, safe to call
//! from any number of threads. One value always yields one commitment.
//! There is no blinding factor, so the commitment of a low-entropy value is
//! open to a dictionary search by anyone who can enumerate the candidate
//! range; the range proof never relies on the commitment for hiding.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::error::AssessmentError;
use super::field;
use super::mimc::Mimc7;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A MiMC-7 commitment to a private value.
///
/// Serialises as its hex digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Commitment {
    scalar: Fr,
}

impl Commitment {
    /// The commitment as a field element (the circuit's public input).
    pub fn scalar(&self) -> Fr {
        self.scalar
    }

    /// `0x` + 64 hex digits, big-endian.
    pub fn to_hex(&self) -> String {
        field::to_hex(&self.scalar)
    }

    /// Decimal rendering, as the circuit input schema and public signals
    /// carry it.
    pub fn to_decimal(&self) -> String {
        field::to_decimal(&self.scalar)
    }

    /// Parse a hex digest produced by [`Commitment::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, AssessmentError> {
        field::from_hex(s)
            .map(|scalar| Self { scalar })
            .map_err(|e| AssessmentError::Encoding(format!("commitment digest: {e}")))
    }

    pub(crate) fn from_scalar(scalar: Fr) -> Self {
        Self { scalar }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl FromStr for Commitment {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Commitment {
    type Error = AssessmentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Commitment> for String {
    fn from(c: Commitment) -> Self {
        c.to_hex()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Commit to a private integer.
///
/// # Errors
///
/// [`AssessmentError::Encoding`] for negative values, which have no
/// field-element representation in the circuit's value domain.
pub fn commit(value: i64) -> Result<Commitment, AssessmentError> {
    let value = u64::try_from(value).map_err(|_| {
        AssessmentError::Encoding("private value must be a non-negative integer".into())
    })?;
    Ok(commit_u64(value))
}

/// Commit to a non-negative 64-bit value. Infallible.
pub fn commit_u64(value: u64) -> Commitment {
    commit_field(Fr::from(value))
}

/// Commit to an arbitrary-precision decimal integer.
///
/// # Errors
///
/// [`AssessmentError::Encoding`] unless `value` is a canonical decimal below
/// the BN254 scalar field modulus.
pub fn commit_decimal(value: &str) -> Result<Commitment, AssessmentError> {
    let n = BigUint::parse_bytes(value.as_bytes(), 10)
        .filter(|_| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            AssessmentError::Encoding("private value must be a non-negative decimal integer".into())
        })?;
    let scalar = field::from_biguint(&n).map_err(|e| AssessmentError::Encoding(e.to_string()))?;
    Ok(commit_field(scalar))
}

/// Commit to a field element.
pub fn commit_field(value: Fr) -> Commitment {
    Commitment::from_scalar(Mimc7::commitment().hash(value))
}

/// Check that `commitment` opens to `value`.
///
/// Not zero-knowledge: the value is revealed to whoever runs this. Audit use
/// only.
pub fn verify_opening(commitment: &Commitment, value: u64) -> bool {
    commit_u64(value) == *commitment
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_deterministic() {
        for v in [0i64, 1, 55, 100, i64::MAX] {
            assert_eq!(commit(v).unwrap(), commit(v).unwrap());
        }
    }

    #[test]
    fn different_values_different_commitments() {
        assert_ne!(commit(55).unwrap(), commit(56).unwrap());
    }

    #[test]
    fn negative_value_is_encoding_error() {
        let err = commit(-1).unwrap_err();
        assert!(matches!(err, AssessmentError::Encoding(_)));
        assert!(!err.to_string().contains("-1"));
    }

    #[test]
    fn decimal_entry_point_agrees_with_integer() {
        assert_eq!(commit_decimal("55").unwrap(), commit(55).unwrap());
    }

    #[test]
    fn decimal_entry_point_accepts_wide_values() {
        // 2^100 does not fit an i64 but is a fine field element.
        let wide = (BigUint::from(1u8) << 100usize).to_str_radix(10);
        let c = commit_decimal(&wide).unwrap();
        assert_ne!(c, commit(0).unwrap());
    }

    #[test]
    fn decimal_entry_point_rejects_out_of_field() {
        let too_big = "9".repeat(80);
        assert!(matches!(
            commit_decimal(&too_big),
            Err(AssessmentError::Encoding(_))
        ));
        assert!(matches!(commit_decimal("-3"), Err(AssessmentError::Encoding(_))));
        assert!(matches!(commit_decimal(""), Err(AssessmentError::Encoding(_))));
    }

    #[test]
    fn hex_digest_round_trip() {
        let c = commit(55).unwrap();
        let hex = c.to_hex();
        assert_eq!(hex.len(), 66);
        assert_eq!(Commitment::from_hex(&hex).unwrap(), c);
        assert_eq!(hex.parse::<Commitment>().unwrap(), c);
    }

    #[test]
    fn serde_uses_hex_digest() {
        let c = commit(42).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, format!("\"{}\"", c.to_hex()));
        let back: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_str::<Commitment>("\"0xnothex\"").is_err());
    }

    #[test]
    fn opening_check() {
        let c = commit(42).unwrap();
        assert!(verify_opening(&c, 42));
        assert!(!verify_opening(&c, 43));
    }

    #[test]
    fn concurrent_commits_agree() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| commit(55).unwrap()))
            .collect();
        let expected = commit(55).unwrap();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}

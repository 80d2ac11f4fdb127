//! # Field Element Encoding
//!
//! The adapter boundary between integers / strings and BN254 scalar field
//! elements. Two textual forms exist:
//!
//! | form    | used for                         | example              |
//! |---------|----------------------------------|----------------------|
//! | decimal | circuit inputs, public signals   | `"55"`, `"218…607"` |
//! | hex     | commitment digests               | `"0x00…1f"` (64 hex) |
//!
//! Decimal is how signals travel; hex is how the commitment is stored and
//! displayed. Signed integers map to the field the usual way, `-x` becoming
//! `p - x`, so a negative bound shows up as a decimal just below `p`. Both parsers are strict: a string maps to at most
//! one field element and every field element has exactly one rendering, so a
//! tampered signal can never alias an honest one.

use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, Field, PrimeField};
use num_bigint::BigUint;
use thiserror::Error;

use crate::config::COMMITMENT_HEX_LEN;

/// Errors produced when decoding a field element from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldEncodingError {
    #[error("not a decimal integer")]
    NotDecimal,

    #[error("non-canonical encoding (leading zeros)")]
    NonCanonical,

    #[error("not a 32-byte hex digest")]
    NotHex,

    #[error("value is not below the BN254 scalar field modulus")]
    OutOfField,
}

/// Render a field element as its canonical decimal string.
pub fn to_decimal(x: &Fr) -> String {
    to_biguint(x).to_str_radix(10)
}

/// Parse a canonical decimal string (no sign, no leading zeros) into a field
/// element, rejecting anything `>= p`.
pub fn from_decimal(s: &str) -> Result<Fr, FieldEncodingError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldEncodingError::NotDecimal);
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(FieldEncodingError::NonCanonical);
    }
    let n = BigUint::parse_bytes(s.as_bytes(), 10).ok_or(FieldEncodingError::NotDecimal)?;
    from_biguint(&n)
}

/// Render a field element as `0x` + 64 lowercase hex digits (big-endian).
pub fn to_hex(x: &Fr) -> String {
    format!("0x{}", hex::encode(x.into_bigint().to_bytes_be()))
}

/// Parse a 32-byte big-endian hex digest (optional `0x` prefix).
pub fn from_hex(s: &str) -> Result<Fr, FieldEncodingError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != COMMITMENT_HEX_LEN {
        return Err(FieldEncodingError::NotHex);
    }
    let bytes = hex::decode(digits).map_err(|_| FieldEncodingError::NotHex)?;

    // Big-endian bytes → little-endian u64 limbs.
    let mut limbs = [0u64; 4];
    for (i, chunk) in bytes.rchunks(8).enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        limbs[i] = u64::from_be_bytes(word);
    }
    Fr::from_bigint(BigInt::new(limbs)).ok_or(FieldEncodingError::OutOfField)
}

/// Signed integer as a field element; negatives wrap to `p - |x|`.
pub fn from_i64(x: i64) -> Fr {
    let magnitude = Fr::from(x.unsigned_abs());
    if x < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Inverse of [`from_i64`]. `None` for elements that no `i64` maps to.
pub fn to_i64(x: &Fr) -> Option<i64> {
    if let Ok(v) = i64::try_from(&to_biguint(x)) {
        return Some(v);
    }
    let magnitude = u64::try_from(&to_biguint(&-*x)).ok()?;
    match magnitude.cmp(&i64::MIN.unsigned_abs()) {
        std::cmp::Ordering::Less => Some(-(magnitude as i64)),
        std::cmp::Ordering::Equal => Some(i64::MIN),
        std::cmp::Ordering::Greater => None,
    }
}

/// Convert an arbitrary-precision integer, rejecting values `>= p`.
pub fn from_biguint(n: &BigUint) -> Result<Fr, FieldEncodingError> {
    let digits = n.to_u64_digits();
    if digits.len() > 4 {
        return Err(FieldEncodingError::OutOfField);
    }
    let mut limbs = [0u64; 4];
    limbs[..digits.len()].copy_from_slice(&digits);
    Fr::from_bigint(BigInt::new(limbs)).ok_or(FieldEncodingError::OutOfField)
}

/// Canonical integer value of a field element.
pub fn to_biguint(x: &Fr) -> BigUint {
    let mut bytes = Vec::with_capacity(32);
    for limb in x.into_bigint().0 {
        bytes.extend_from_slice(&limb.to_le_bytes());
    }
    BigUint::from_bytes_le(&bytes)
}

/// Little-endian bit decomposition of the canonical integer, truncated to
/// `n` bits.
pub fn to_bits_le(x: &Fr, n: usize) -> Vec<bool> {
    x.into_bigint().to_bits_le().into_iter().take(n).collect()
}

/// `2^bits` as a field element.
pub fn pow2(bits: usize) -> Fr {
    Fr::from(2u64).pow([bits as u64])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, Zero};

    fn modulus() -> BigUint {
        BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le())
    }

    #[test]
    fn decimal_small_values() {
        assert_eq!(to_decimal(&Fr::zero()), "0");
        assert_eq!(to_decimal(&Fr::from(55u64)), "55");
        assert_eq!(from_decimal("100").unwrap(), Fr::from(100u64));
        assert_eq!(from_decimal("0").unwrap(), Fr::zero());
    }

    #[test]
    fn decimal_rejects_garbage() {
        assert_eq!(from_decimal(""), Err(FieldEncodingError::NotDecimal));
        assert_eq!(from_decimal("-1"), Err(FieldEncodingError::NotDecimal));
        assert_eq!(from_decimal("+1"), Err(FieldEncodingError::NotDecimal));
        assert_eq!(from_decimal("1e3"), Err(FieldEncodingError::NotDecimal));
        assert_eq!(from_decimal("007"), Err(FieldEncodingError::NonCanonical));
    }

    #[test]
    fn decimal_rejects_modulus_and_above() {
        let p = modulus();
        assert_eq!(
            from_decimal(&p.to_str_radix(10)),
            Err(FieldEncodingError::OutOfField)
        );
        let p_minus_one = &p - 1u32;
        let x = from_decimal(&p_minus_one.to_str_radix(10)).unwrap();
        assert_eq!(x, -Fr::one());
        assert_eq!(to_decimal(&x), p_minus_one.to_str_radix(10));
    }

    #[test]
    fn hex_is_fixed_width_big_endian() {
        let h = to_hex(&Fr::from(255u64));
        assert_eq!(h.len(), 66);
        assert!(h.starts_with("0x"));
        assert!(h.ends_with("ff"));
        assert_eq!(from_hex(&h).unwrap(), Fr::from(255u64));
        // Prefix is optional on input.
        assert_eq!(from_hex(&h[2..]).unwrap(), Fr::from(255u64));
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert_eq!(from_hex("0x1234"), Err(FieldEncodingError::NotHex));
        assert_eq!(from_hex(&"zz".repeat(32)), Err(FieldEncodingError::NotHex));
        assert_eq!(
            from_hex(&"ff".repeat(32)),
            Err(FieldEncodingError::OutOfField)
        );
    }

    #[test]
    fn hex_of_large_element_round_trips() {
        let x = -Fr::from(12345u64);
        assert_eq!(from_hex(&to_hex(&x)).unwrap(), x);
    }

    #[test]
    fn signed_integers_wrap_below_modulus() {
        assert_eq!(from_i64(0), Fr::zero());
        assert_eq!(from_i64(100), Fr::from(100u64));
        assert_eq!(from_i64(-10), -Fr::from(10u64));
        assert_eq!(
            to_biguint(&from_i64(-1)),
            modulus() - 1u32,
            "-1 is p - 1"
        );
        for x in [0i64, 1, -1, 55, -10, i64::MAX, i64::MIN] {
            assert_eq!(to_i64(&from_i64(x)), Some(x), "{x}");
        }
    }

    #[test]
    fn to_i64_rejects_elements_outside_the_window() {
        assert_eq!(to_i64(&Fr::from(u64::MAX)), None);
        assert_eq!(to_i64(&pow2(63)), None);
        assert_eq!(to_i64(&(-pow2(63) - Fr::one())), None);
        assert_eq!(to_i64(&-pow2(63)), Some(i64::MIN));
        assert_eq!(to_i64(&pow2(200)), None);
    }

    #[test]
    fn bits_and_powers() {
        let bits = to_bits_le(&Fr::from(0b1011u64), 5);
        assert_eq!(bits, vec![true, true, false, true, false]);
        assert_eq!(pow2(10), Fr::from(1024u64));
        assert_eq!(pow2(0), Fr::one());
        assert_eq!(pow2(64), Fr::from(2u64).square().pow([32u64]));
    }
}

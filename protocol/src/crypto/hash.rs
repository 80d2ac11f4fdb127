//! # Hashing Utilities
//!
//! BLAKE3 is the only general-purpose hash in the crate. It is used for:
//!
//! - **fingerprints** of verification keys and proving keys, so logs and
//!   stored records can name a key without carrying it;
//! - **hash-to-field** derivation of the MiMC key and round constants.
//!
//! The commitment itself is *not* a BLAKE3 digest: it has to be recomputed
//! inside the circuit, so it uses the arithmetic-friendly MiMC-7 permutation
//! in [`crate::zkp::mimc`].

use ark_bn254::Fr;
use ark_ff::PrimeField;

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 using `derive_key` mode.
///
/// Two different contexts never collide even for identical `data`, because
/// the context selects a different internal IV.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Hash `data` under `context` to a BN254 scalar field element.
///
/// BLAKE3 output (256 bits) is reduced modulo the ~254-bit field order; the
/// bias of the reduction is negligible.
pub fn hash_to_field_in(context: &str, data: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(&domain_separated_hash(context, data))
}

/// Hex-encoded BLAKE3 fingerprint of a byte string (64 hex digits).
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(blake3_hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_deterministic() {
        let a = blake3_hash(b"riskproof");
        let b = blake3_hash(b"riskproof");
        assert_eq!(a, b);
        assert_ne!(a, blake3_hash(b"RiskProof"));
    }

    #[test]
    fn domain_separation() {
        let data = b"same data";
        assert_ne!(
            domain_separated_hash("context-a", data),
            domain_separated_hash("context-b", data)
        );
        assert_ne!(domain_separated_hash("context-a", data), blake3_hash(data));
    }

    #[test]
    fn hash_to_field_deterministic_and_separated() {
        assert_eq!(hash_to_field_in("a", b"x"), hash_to_field_in("a", b"x"));
        assert_ne!(hash_to_field_in("a", b"x"), hash_to_field_in("a", b"y"));
        assert_ne!(hash_to_field_in("a", b"x"), hash_to_field_in("b", b"x"));
    }

    #[test]
    fn fingerprint_is_hex_of_blake3() {
        let fp = fingerprint(b"vk bytes");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, hex::encode(blake3_hash(b"vk bytes")));
    }
}

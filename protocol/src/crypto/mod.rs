//! # Cryptographic Helpers
//!
//! Thin wrappers around audited primitives. The proof system itself lives in
//! [`crate::zkp`]; this module only carries the hashing the rest of the crate
//! leans on.

pub mod hash;

pub use hash::{blake3_hash, domain_separated_hash, fingerprint, hash_to_field_in};

//! # MiMC-7 over the BN254 scalar field
//!
//! The commitment hash. It is evaluated natively by the encoder and as
//! constraints inside the circuit, so both evaluations live
//! here, driven by the same key and round constants:
//!
//! ```text
//! t_0     = x
//! t_{i+1} = (t_i + k + c_i)^7        for i in 0..91,  c_0 = 0
//! H(x)    = t_91 + k
//! ```
//!
//! `x ↦ x^7` is a permutation of Fr because `gcd(7, r - 1) = 1` for BN254,
//! which is why the exponent is 7 rather than 3.
//!
//! Cost in-circuit: four multiplication gates per round (`u²`, `u⁴`, `u⁴·u²`,
//! `·u`), 364 constraints total.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_ff::{Field, Zero};
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::SynthesisError;

use crate::config::{COMMITMENT_DOMAIN, MIMC_CONSTANTS_DOMAIN, MIMC_ROUNDS};
use crate::crypto::hash_to_field_in;

/// Keyed MiMC-7 permutation with precomputed round constants.
#[derive(Clone, Debug)]
pub struct Mimc7 {
    key: Fr,
    constants: Vec<Fr>,
}

static COMMITMENT_HASHER: OnceLock<Mimc7> = OnceLock::new();

impl Mimc7 {
    /// Build a hasher for `key` with the protocol round constants.
    pub fn new(key: Fr) -> Self {
        let constants = (0..MIMC_ROUNDS)
            .map(|i| {
                if i == 0 {
                    Fr::zero()
                } else {
                    hash_to_field_in(MIMC_CONSTANTS_DOMAIN, &(i as u64).to_le_bytes())
                }
            })
            .collect();
        Self { key, constants }
    }

    /// The hasher used for assessment commitments. Built once per process.
    pub fn commitment() -> &'static Self {
        COMMITMENT_HASHER.get_or_init(|| Self::new(hash_to_field_in(COMMITMENT_DOMAIN, b"key")))
    }

    pub fn key(&self) -> Fr {
        self.key
    }

    /// Native evaluation.
    pub fn hash(&self, x: Fr) -> Fr {
        let mut t = x;
        for c in &self.constants {
            let u = t + self.key + c;
            let u2 = u.square();
            let u4 = u2.square();
            t = u4 * u2 * u;
        }
        t + self.key
    }

    /// In-circuit evaluation. Must agree with [`Mimc7::hash`] on every input.
    pub fn hash_gadget(&self, x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        let mut t = x.clone();
        for c in &self.constants {
            let round_constant = FpVar::constant(self.key + c);
            let u = &t + &round_constant;
            let u2 = u.square()?;
            let u4 = u2.square()?;
            t = &(&u4 * &u2) * &u;
        }
        Ok(&t + &FpVar::constant(self.key))
    }
}

//! # Range Assessment R1CS Circuit
//!
//! The statement being proved:
//!
//! ```text
//! "I know `value` such that:
//!     1. MiMC7(value) = commitment               (commitment opens)
//!     2. inRange = [min_bound <= value <= max_bound]"
//! ```
//!
//! `inRange` is a public *output*, not an assertion. A witness with the
//! value outside the range still satisfies the constraints and yields a
//! proof whose first public signal is `0`; the verifier treats such a proof
//! as invalid.
//!
//! ## Comparators
//!
//! Operands are signed: a bound of `-10` arrives as the field element
//! `p - 10`. Every operand `x` is first shifted to `x' = x + 2^(n-1)`, which
//! maps the window `[-2^(n-1), 2^(n-1))` onto `[0, 2^n)`. The shift is
//! monotone on that window, so comparing shifted operands compares the
//! originals.
//!
//! For `a', b' ∈ [0, 2^n)` let `d = a' - b' + 2^n`. Then `0 < d < 2^(n+1)`,
//! so `d` has a unique `(n+1)`-bit decomposition whose top bit is `1` iff
//! `a >= b`. The shifted operands are forced into `[0, 2^n)` by their own
//! `n`-bit decompositions; without that, a field wrap-around could flip the
//! comparison.
//!
//! ## Public inputs (in order)
//!
//! | index | signal       |
//! |-------|--------------|
//! | 0     | `inRange`    |
//! | 1     | `commitment` |
//! | 2     | `minBound`   |
//! | 3     | `maxBound`   |
//!
//! Constraint count at `n = 64`: 364 (MiMC) + 3·65 (operand widths)
//! + 2·66 (comparators) + 2 ≈ 693.

use ark_bn254::Fr;
use ark_ff::{One, Zero};
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use super::field::{from_i64, pow2, to_bits_le};
use super::mimc::Mimc7;

// ---------------------------------------------------------------------------
// Circuit definition
// ---------------------------------------------------------------------------

/// Groth16 R1CS circuit for a committed range claim.
///
/// Witness fields are `Option<_>` so the same struct describes the
/// constraint topology during key generation (all `None`).
#[derive(Clone)]
pub struct RangeProofCircuit {
    /// Comparator width `n`. Part of the circuit shape: keys generated for
    /// one width do not verify proofs of another.
    pub range_bits: usize,

    // -- Private witness ----------------------------------------------------
    pub value: Option<Fr>,

    // -- Public inputs ------------------------------------------------------
    pub commitment: Option<Fr>,
    pub min_bound: Option<Fr>,
    pub max_bound: Option<Fr>,
}

impl RangeProofCircuit {
    /// Fully populated circuit for proof generation.
    pub fn new(range_bits: usize, value: u64, commitment: Fr, min_bound: i64, max_bound: i64) -> Self {
        Self {
            range_bits,
            value: Some(Fr::from(value)),
            commitment: Some(commitment),
            min_bound: Some(from_i64(min_bound)),
            max_bound: Some(from_i64(max_bound)),
        }
    }

    /// Blank circuit for CRS generation.
    pub fn blank(range_bits: usize) -> Self {
        Self {
            range_bits,
            value: None,
            commitment: None,
            min_bound: None,
            max_bound: None,
        }
    }

    /// Native value of the `inRange` output, `None` in key-gen mode.
    pub fn in_range(&self) -> Option<bool> {
        let n = self.range_bits;
        let value = shift(self.value, n)?;
        let min = shift(self.min_bound, n)?;
        let max = shift(self.max_bound, n)?;
        let ge_min = comparator_bits(Some(value), Some(min), n)?;
        let le_max = comparator_bits(Some(max), Some(value), n)?;
        Some(ge_min[n] && le_max[n])
    }
}

// ---------------------------------------------------------------------------
// Constraint synthesizer
// ---------------------------------------------------------------------------

impl ConstraintSynthesizer<Fr> for RangeProofCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let n = self.range_bits;
        let half = n
            .checked_sub(1)
            .map(pow2)
            .ok_or(SynthesisError::Unsatisfiable)?;

        // ===================================================================
        // 1. Public inputs, in signal order
        // ===================================================================

        let in_range_native = self.in_range();
        let in_range_var = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "in_range"), || {
            in_range_native
                .map(|b| if b { Fr::one() } else { Fr::zero() })
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        let commitment_var = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "commitment"), || {
            self.commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let min_var = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "min_bound"), || {
            self.min_bound.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let max_var = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "max_bound"), || {
            self.max_bound.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ===================================================================
        // 2. Private witness
        // ===================================================================

        let value_var = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "value"), || {
            self.value.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ===================================================================
        // 3. Commitment opens: MiMC7(value) == commitment
        // ===================================================================

        let computed = Mimc7::commitment().hash_gadget(&value_var)?;
        computed.enforce_equal(&commitment_var)?;

        // ===================================================================
        // 4. Shifted operands fit the comparator width
        // ===================================================================

        let half_var = FpVar::<Fr>::constant(half);
        let value_shifted = &value_var + &half_var;
        let min_shifted = &min_var + &half_var;
        let max_shifted = &max_var + &half_var;
        let value_native = shift(self.value, n);
        let min_native = shift(self.min_bound, n);
        let max_native = shift(self.max_bound, n);

        enforce_bit_length(&cs, &value_shifted, value_native, n)?;
        enforce_bit_length(&cs, &min_shifted, min_native, n)?;
        enforce_bit_length(&cs, &max_shifted, max_native, n)?;

        // ===================================================================
        // 5. inRange = (value >= min) AND (max >= value)
        // ===================================================================

        let ge_min = greater_or_equal(&cs, &value_shifted, &min_shifted, value_native, min_native, n)?;
        let le_max = greater_or_equal(&cs, &max_shifted, &value_shifted, max_native, value_native, n)?;
        let in_range = ge_min.and(&le_max)?;

        FpVar::<Fr>::from(in_range).enforce_equal(&in_range_var)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Gadgets
// ---------------------------------------------------------------------------

/// Allocate `bits` boolean witnesses, one per little-endian bit of `native`,
/// and return the field element they recompose to.
fn recompose_bits(
    cs: &ConstraintSystemRef<Fr>,
    native_bits: Option<Vec<bool>>,
    bits: usize,
) -> Result<(FpVar<Fr>, Vec<Boolean<Fr>>), SynthesisError> {
    let mut recomposed = FpVar::<Fr>::zero();
    let mut power_of_two = FpVar::<Fr>::one();
    let two = FpVar::<Fr>::constant(Fr::from(2u64));
    let mut allocated = Vec::with_capacity(bits);

    for i in 0..bits {
        let bit = Boolean::<Fr>::new_witness(ark_relations::ns!(cs, "bit"), || {
            native_bits
                .as_ref()
                .map(|b| b[i])
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        recomposed += FpVar::<Fr>::from(bit.clone()) * &power_of_two;
        power_of_two *= &two;
        allocated.push(bit);
    }

    Ok((recomposed, allocated))
}

/// Constrain `var` to `[0, 2^bits)`.
fn enforce_bit_length(
    cs: &ConstraintSystemRef<Fr>,
    var: &FpVar<Fr>,
    native: Option<Fr>,
    bits: usize,
) -> Result<(), SynthesisError> {
    let native_bits = native.map(|x| to_bits_le(&x, bits));
    let (recomposed, _) = recompose_bits(cs, native_bits, bits)?;
    recomposed.enforce_equal(var)
}

/// `a >= b` for operands already constrained to `[0, 2^bits)`.
fn greater_or_equal(
    cs: &ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    a_native: Option<Fr>,
    b_native: Option<Fr>,
    bits: usize,
) -> Result<Boolean<Fr>, SynthesisError> {
    let offset = FpVar::<Fr>::constant(pow2(bits));
    let shifted = &(a - b) + &offset;

    let native_bits = comparator_bits(a_native, b_native, bits);
    let (recomposed, mut allocated) = recompose_bits(cs, native_bits, bits + 1)?;
    recomposed.enforce_equal(&shifted)?;

    allocated.pop().ok_or(SynthesisError::Unsatisfiable)
}

/// `x + 2^(bits-1)`: the signed window `[-2^(bits-1), 2^(bits-1))` moved onto
/// `[0, 2^bits)`.
fn shift(x: Option<Fr>, bits: usize) -> Option<Fr> {
    Some(x? + pow2(bits.checked_sub(1)?))
}

/// Bits of `a - b + 2^bits`, `bits + 1` of them.
fn comparator_bits(a: Option<Fr>, b: Option<Fr>, bits: usize) -> Option<Vec<bool>> {
    let shifted = a? - b? + pow2(bits);
    Some(to_bits_le(&shifted, bits + 1))
}

/// Public input vector in allocation order. Must stay in sync with
/// `generate_constraints`.
pub fn public_inputs(in_range: bool, commitment: Fr, min_bound: i64, max_bound: i64) -> Vec<Fr> {
    vec![
        if in_range { Fr::one() } else { Fr::zero() },
        commitment,
        from_i64(min_bound),
        from_i64(max_bound),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

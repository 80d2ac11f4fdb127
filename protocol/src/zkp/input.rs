//! # Circuit Input Builder
//!
//! Validates an assessment claim and assembles the signal assignment the
//! range circuit expects. Everything that can be rejected without running
//! the prover is rejected here:
//!
//! 1. `min_bound <= max_bound`                  → `RangeViolation`
//! 2. `min_bound <= value <= max_bound`         → `RangeViolation`
//! 3. `value` is non-negative                   → `Encoding`
//! 4. commitment opens to `value`               → `Encoding`
//!
//! Bounds are any `i64`, negative ones included; the comparators cover the
//! whole signed 64-bit window. Only the private value has to be
//! non-negative, because that is all the commitment encoder accepts.
//!
//! The circuit itself would also notice an out-of-range value (it emits a
//! public `inRange = 0`), but a proof of a false claim is useless to the
//! caller, so the builder fails fast instead.
//!
//! ## Signal schema
//!
//! | signal       | visibility | encoding |
//! |--------------|------------|----------|
//! | `value`      | private    | decimal  |
//! | `commitment` | public     | decimal  |
//! | `minBound`   | public     | decimal, `-b` as `p - b` |
//! | `maxBound`   | public     | decimal, `-b` as `p - b` |
//!
//! The commitment is stored and displayed as a hex digest but enters the
//! circuit as a decimal field element; [`CircuitInput::commitment_signal`] is
//! where that conversion happens.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::commitment::{self, Commitment};
use super::error::AssessmentError;
use super::field;

/// Private witness value. Wiped from memory when the input is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct PrivateValue(u64);

/// Validated, immutable input for one proving run.
#[derive(Clone)]
pub struct CircuitInput {
    value: PrivateValue,
    commitment: Commitment,
    min_bound: i64,
    max_bound: i64,
}

impl CircuitInput {
    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn min_bound(&self) -> i64 {
        self.min_bound
    }

    pub fn max_bound(&self) -> i64 {
        self.max_bound
    }

    /// Commitment in the prover's input encoding (decimal field element).
    pub fn commitment_signal(&self) -> String {
        self.commitment.to_decimal()
    }

    /// The public signal vector a proof of this input must carry:
    /// `[inRange, commitment, minBound, maxBound]`.
    pub fn expected_public_signals(&self) -> Vec<String> {
        vec![
            "1".to_string(),
            self.commitment_signal(),
            field::to_decimal(&field::from_i64(self.min_bound)),
            field::to_decimal(&field::from_i64(self.max_bound)),
        ]
    }

    pub(crate) fn private_value(&self) -> u64 {
        self.value.0
    }

    /// Assemble an input without any of the builder's checks. Lets tests
    /// hand the prover claims the builder would refuse.
    #[cfg(test)]
    pub(crate) fn unchecked(
        value: u64,
        commitment: Commitment,
        min_bound: i64,
        max_bound: i64,
    ) -> Self {
        Self {
            value: PrivateValue(value),
            commitment,
            min_bound,
            max_bound,
        }
    }
}

impl fmt::Debug for CircuitInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitInput")
            .field("value", &"<redacted>")
            .field("commitment", &self.commitment)
            .field("min_bound", &self.min_bound)
            .field("max_bound", &self.max_bound)
            .finish()
    }
}

/// Validate a claim and build the circuit input.
///
/// # Errors
///
/// See the module docs for the order of checks. Error messages never contain
/// `value`.
pub fn build(
    value: i64,
    min_bound: i64,
    max_bound: i64,
    commitment: &Commitment,
) -> Result<CircuitInput, AssessmentError> {
    if min_bound > max_bound {
        return Err(AssessmentError::RangeViolation(format!(
            "minBound ({min_bound}) exceeds maxBound ({max_bound})"
        )));
    }
    if value < min_bound || value > max_bound {
        return Err(AssessmentError::RangeViolation(format!(
            "private value lies outside the declared range [{min_bound}, {max_bound}]"
        )));
    }

    let value_u = u64::try_from(value).map_err(|_| {
        AssessmentError::Encoding("private value must be a non-negative integer".into())
    })?;

    if !commitment::verify_opening(commitment, value_u) {
        return Err(AssessmentError::Encoding(
            "commitment does not open to the private value".into(),
        ));
    }

    Ok(CircuitInput {
        value: PrivateValue(value_u),
        commitment: *commitment,
        min_bound,
        max_bound,
    })
}

//! # Proof Artifacts
//!
//! [`Proof`] is an opaque byte blob (a compressed Groth16 proof, ~128 bytes
//! on BN254) and [`PublicSignals`] the ordered decimal field elements the
//! circuit disclosed. They are produced together by one proving run and
//! travel together as a [`ProofBundle`]; nothing in the crate builds one
//! half without the other.
//!
//! On the wire the proof is a hex string and the signals an array of
//! decimal strings.

use std::fmt;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use super::error::AssessmentError;
use super::field;
use crate::config::PUBLIC_SIGNAL_COUNT;

// ---------------------------------------------------------------------------
// Proof
// ---------------------------------------------------------------------------

/// Serialized proof bytes. Treated as immutable and uninterpreted by
/// everything except the proving backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Proof {
    bytes: Vec<u8>,
}

impl Proof {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the proof in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, AssessmentError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(digits)
            .map(Self::from_bytes)
            .map_err(|e| AssessmentError::MalformedInput(format!("proof is not hex: {e}")))
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({} bytes)", self.bytes.len())
    }
}

impl TryFrom<String> for Proof {
    type Error = AssessmentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Proof> for String {
    fn from(p: Proof) -> Self {
        p.to_hex()
    }
}

// ---------------------------------------------------------------------------
// PublicSignals
// ---------------------------------------------------------------------------

/// Ordered public signals: `[inRange, commitment, minBound, maxBound]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignals(Vec<String>);

impl PublicSignals {
    pub fn new(signals: Vec<String>) -> Self {
        Self(signals)
    }

    pub(crate) fn from_field_elements(elements: &[Fr]) -> Self {
        Self(elements.iter().map(field::to_decimal).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse every signal into a field element, enforcing the circuit's
    /// signal count and canonical decimal encoding.
    pub fn to_field_elements(&self) -> Result<Vec<Fr>, AssessmentError> {
        if self.0.len() != PUBLIC_SIGNAL_COUNT {
            return Err(AssessmentError::MalformedInput(format!(
                "expected {PUBLIC_SIGNAL_COUNT} public signals, got {}",
                self.0.len()
            )));
        }
        self.0
            .iter()
            .enumerate()
            .map(|(i, s)| {
                field::from_decimal(s).map_err(|e| {
                    AssessmentError::MalformedInput(format!("public signal #{i}: {e}"))
                })
            })
            .collect()
    }

    /// The commitment signal, if present.
    pub fn commitment_signal(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    /// The disclosed `(minBound, maxBound)` pair, decoded back to signed
    /// integers. `None` if either is missing or not an `i64` encoding.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let decode = |s: &String| field::from_decimal(s).ok().and_then(|x| field::to_i64(&x));
        let min = decode(self.0.get(2)?)?;
        let max = decode(self.0.get(3)?)?;
        Some((min, max))
    }

    /// Mutable access for tamper tests.
    #[cfg(test)]
    pub(crate) fn signals_mut(&mut self) -> &mut Vec<String> {
        &mut self.0
    }
}

// ---------------------------------------------------------------------------
// ProofBundle
// ---------------------------------------------------------------------------

/// A proof and the public signals it was generated for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub proof: Proof,
    pub public_signals: PublicSignals,
}

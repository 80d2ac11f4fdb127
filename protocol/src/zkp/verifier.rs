//! # Groth16 Proof Verification
//!
//! Checks a proof against a verification key and its public signals. The
//! verifier needs nothing from the proving side: any party holding the
//! key can run it.
//!
//! Verification fails closed. Ill-shaped input is reported as
//! [`AssessmentError::MalformedInput`]; everything else produces a
//! [`VerificationOutcome`] whose `is_valid` is `true` only when the pairing
//! check passes **and** the proof claims `inRange = 1`. A key from another
//! circuit is a negative result, not an error.
//!
//! Groth16 verification is three pairings plus a 4-term multi-scalar
//! multiplication, a few milliseconds regardless of circuit size.

use std::fmt;

use ark_bn254::{Bn254, Fr};
use ark_ff::One;
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::artifacts::{
    fetch_with_retry, verification_key_file, ArtifactFetchError, ArtifactSource, FetchPolicy,
};
use super::error::AssessmentError;
use super::proof::{Proof, PublicSignals};
use crate::crypto::fingerprint;

// ---------------------------------------------------------------------------
// VerificationKey
// ---------------------------------------------------------------------------

/// A Groth16 verification key, pre-processed for repeated use.
///
/// Immutable once loaded. Identified by the BLAKE3 fingerprint of its
/// compressed encoding, which is what assessment records store.
#[derive(Clone)]
pub struct VerificationKey {
    pvk: PreparedVerifyingKey<Bn254>,
    bytes: Bytes,
    fingerprint: String,
}

impl VerificationKey {
    pub(crate) fn from_ark(vk: VerifyingKey<Bn254>) -> Result<Self, AssessmentError> {
        let mut buf = Vec::new();
        vk.serialize_compressed(&mut buf).map_err(|e| {
            AssessmentError::Proving(format!("verification key serialization failed: {e}"))
        })?;
        Ok(Self::assemble(vk, Bytes::from(buf)))
    }

    fn assemble(vk: VerifyingKey<Bn254>, bytes: Bytes) -> Self {
        let fingerprint = fingerprint(&bytes);
        Self {
            pvk: prepare_verifying_key(&vk),
            bytes,
            fingerprint,
        }
    }

    /// Decode a compressed verification key.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ArtifactFetchError> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(data)
            .map_err(|e| ArtifactFetchError::Corrupt(format!("verification key: {e}")))?;
        Ok(Self::assemble(vk, Bytes::copy_from_slice(data)))
    }

    pub fn from_hex(s: &str) -> Result<Self, ArtifactFetchError> {
        let data = hex::decode(s.trim().trim_start_matches("0x"))
            .map_err(|e| ArtifactFetchError::Corrupt(format!("verification key hex: {e}")))?;
        Self::from_bytes(&data)
    }

    /// Load `<circuit_id>.vk` from an artifact source.
    pub async fn fetch(
        source: &dyn ArtifactSource,
        circuit_id: &str,
        policy: FetchPolicy,
    ) -> Result<Self, ArtifactFetchError> {
        let data = fetch_with_retry(source, &verification_key_file(circuit_id), policy).await?;
        let vk = Self::from_bytes(&data)?;
        debug!(circuit_id, fingerprint = %vk.fingerprint, "verification key loaded");
        Ok(vk)
    }

    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Hex BLAKE3 digest of the compressed key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of public inputs the key was generated for.
    pub fn num_public_inputs(&self) -> usize {
        self.pvk.vk.gamma_abc_g1.len().saturating_sub(1)
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("fingerprint", &self.fingerprint)
            .field("public_inputs", &self.num_public_inputs())
            .finish()
    }
}

impl PartialEq for VerificationKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for VerificationKey {}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a verification came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationDiagnostic {
    /// Pairing check passed and the proof claims the value is in range.
    Valid,
    /// The proof does not verify against these signals under this key.
    PairingCheckFailed,
    /// The key expects a different number of public inputs.
    KeyMismatch,
    /// The proof is genuine but attests `inRange = 0`.
    RangeClaimFalse,
}

/// Result of checking one (proof, public signals, key) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub is_valid: bool,
    pub diagnostic: VerificationDiagnostic,
}

impl VerificationOutcome {
    fn from_diagnostic(diagnostic: VerificationDiagnostic) -> Self {
        Self {
            is_valid: diagnostic == VerificationDiagnostic::Valid,
            diagnostic,
        }
    }
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

/// Verify `proof` against `public_signals` under `vk`.
///
/// # Errors
///
/// [`AssessmentError::MalformedInput`] when the signals have the wrong count
/// or encoding, or the proof bytes do not decode to curve points.
pub fn verify(
    proof: &Proof,
    public_signals: &PublicSignals,
    vk: &VerificationKey,
) -> Result<VerificationOutcome, AssessmentError> {
    let inputs = public_signals.to_field_elements()?;
    let ark_proof = ark_groth16::Proof::<Bn254>::deserialize_compressed(proof.as_bytes())
        .map_err(|e| AssessmentError::MalformedInput(format!("proof encoding: {e}")))?;

    let diagnostic = if vk.num_public_inputs() != inputs.len() {
        VerificationDiagnostic::KeyMismatch
    } else {
        match Groth16::<Bn254>::verify_with_processed_vk(&vk.pvk, &inputs, &ark_proof) {
            Ok(true) if inputs[0] == Fr::one() => VerificationDiagnostic::Valid,
            Ok(true) => VerificationDiagnostic::RangeClaimFalse,
            Ok(false) => VerificationDiagnostic::PairingCheckFailed,
            Err(e) => {
                debug!(error = %e, "verifier rejected input shape");
                VerificationDiagnostic::KeyMismatch
            }
        }
    };

    let outcome = VerificationOutcome::from_diagnostic(diagnostic);
    debug!(
        vk_fingerprint = %vk.fingerprint,
        signals = inputs.len(),
        is_valid = outcome.is_valid,
        ?diagnostic,
        "proof verified"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

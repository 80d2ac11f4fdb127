//! # Zero-Knowledge Proof Module
//!
//! Groth16 range assessments over BN254. A subject's private value `v` is
//! committed with MiMC-7 and the prover demonstrates, without revealing `v`,
//! that the commitment opens to it **and** that `minBound <= v <= maxBound`.
//!
//! ## Architecture
//!
//! ```text
//! field.rs       BN254 scalar <-> decimal / hex encodings
//! mimc.rs        MiMC-7 permutation, native and in-circuit
//! commitment.rs  Commitment Encoder (commit, digest format)
//! input.rs       Circuit Input Builder (validation, signal schema)
//! circuit.rs     R1CS range circuit (RangeProofCircuit)
//! artifacts.rs   manifest / proving key / verification key loading + cache
//! backend.rs     ProvingBackend trait, Groth16Backend, local setup
//! prover.rs      ProofService (async, timeout-bounded proving)
//! proof.rs       Proof, PublicSignals, ProofBundle
//! verifier.rs    VerificationKey, verify, VerificationOutcome
//! error.rs       AssessmentError taxonomy
//! ```
//!
//! ## Security Model
//!
//! - **Commitment binding**: MiMC-7 is a permutation for a fixed key, so one
//!   commitment opens to exactly one field element.
//! - **Commitment hiding**: none beyond the value's own entropy. There is no
//!   blinding factor; see [`commitment`].
//! - **Soundness**: Groth16 knowledge-soundness in the generic group model.
//! - **Range check**: every operand is shifted into `[0, 2^range_bits)` and
//!   decomposed into `range_bits` boolean limbs before comparison, so field
//!   wrap-around cannot fake `inRange`. Bounds may be negative.
//!
//! The trusted setup is per-circuit. [`setup_circuit`] runs it locally; in
//! production, load keys from an MPC ceremony via [`artifacts`].

pub mod artifacts;
pub mod backend;
pub mod circuit;
pub mod commitment;
pub mod error;
pub mod field;
pub mod input;
pub mod mimc;
pub mod proof;
pub mod prover;
pub mod verifier;

pub use artifacts::{
    ArtifactCache, ArtifactFetchError, ArtifactSource, CircuitArtifacts, CircuitManifest,
    FetchPolicy, FsArtifactSource, MemoryArtifactSource,
};
pub use backend::{setup_circuit, CircuitSetup, Groth16Backend, ProvingBackend};
pub use circuit::RangeProofCircuit;
pub use commitment::{commit, Commitment};
pub use error::AssessmentError;
pub use input::CircuitInput;
pub use proof::{Proof, ProofBundle, PublicSignals};
pub use prover::ProofService;
pub use verifier::{verify, VerificationDiagnostic, VerificationKey, VerificationOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RANGE_BITS;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    /// End-to-end: setup -> commit -> build -> prove -> verify.
    #[test]
    fn end_to_end_range_proof() {
        let mut rng = StdRng::seed_from_u64(42);

        // 1. Trusted setup (proving key + verification key)
        let setup = setup_circuit("e2e", RANGE_BITS, &mut rng).unwrap();

        // 2. The subject's private score
        let score = 55i64;
        let c = commit(score).unwrap();

        // 3. They want to show 0 <= score <= 100
        let input = input::build(score, 0, 100, &c).unwrap();

        // 4. Prove
        let bundle = Groth16Backend::new()
            .prove(&input, &setup.artifacts())
            .expect("proof generation must succeed");

        // 5. Verify
        let outcome = verify(&bundle.proof, &bundle.public_signals, &setup.verification_key)
            .expect("verification must not error");
        assert!(outcome.is_valid, "valid proof must verify");
        assert_eq!(
            bundle.public_signals.commitment_signal(),
            Some(c.to_decimal().as_str())
        );
    }

    /// Proof and signals survive a JSON round trip and still verify.
    #[test]
    fn bundle_serialization_round_trip() {
        let mut rng = StdRng::seed_from_u64(43);
        let setup = setup_circuit("e2e_json", RANGE_BITS, &mut rng).unwrap();
        let c = commit(500).unwrap();
        let input = input::build(500, 100, 1000, &c).unwrap();
        let bundle = Groth16Backend::new().prove(&input, &setup.artifacts()).unwrap();

        let json = serde_json::to_string(&bundle).unwrap();
        let restored: ProofBundle = serde_json::from_str(&json).unwrap();

        let outcome = verify(&restored.proof, &restored.public_signals, &setup.verification_key)
            .unwrap();
        assert!(outcome.is_valid, "deserialized proof must still verify");
    }

    /// A narrower circuit's key does not accept a proof from the wider one.
    #[test]
    fn key_from_other_circuit_width_rejects() {
        let mut rng = StdRng::seed_from_u64(44);
        let wide = setup_circuit("wide", RANGE_BITS, &mut rng).unwrap();
        let narrow = setup_circuit("narrow", 32, &mut rng).unwrap();

        let c = commit(7).unwrap();
        let input = input::build(7, 0, 10, &c).unwrap();
        let bundle = Groth16Backend::new().prove(&input, &wide.artifacts()).unwrap();

        let outcome = verify(&bundle.proof, &bundle.public_signals, &narrow.verification_key)
            .unwrap();
        assert!(!outcome.is_valid);
        assert_eq!(outcome.diagnostic, VerificationDiagnostic::PairingCheckFailed);
    }
}

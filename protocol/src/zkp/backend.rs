//! # Proving Backend
//!
//! [`ProvingBackend`] is the seam between the assessment workflow and the
//! proof system. The workflow hands it a validated [`CircuitInput`] plus the
//! circuit's artifacts and gets back a [`ProofBundle`]; it never sees
//! constraint systems or curve points.
//!
//! [`Groth16Backend`] is the production implementation. It parses each
//! proving key once (keyed by the key's fingerprint) and checks the witness
//! against the constraint system before invoking the prover, so an
//! unsatisfiable witness becomes a [`AssessmentError::Proving`] instead of a
//! panic inside `ark-groth16`.
//!
//! [`setup_circuit`] runs a local circuit-specific trusted setup. Fine for
//! development and tests; production keys should come from an MPC ceremony
//! and be loaded through [`super::artifacts`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, info};

use super::artifacts::{
    manifest_file, proving_key_file, verification_key_file, ArtifactFetchError, CircuitArtifacts,
    CircuitManifest, MemoryArtifactSource,
};
use super::circuit::RangeProofCircuit;
use super::error::AssessmentError;
use super::input::CircuitInput;
use super::proof::{Proof, ProofBundle, PublicSignals};
use super::verifier::{self, VerificationKey, VerificationOutcome};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The proof system capability: prove one circuit input, verify one proof.
///
/// Implementations are CPU-bound and blocking; async callers run `prove` on
/// a blocking thread (see [`super::prover::ProofService`]).
pub trait ProvingBackend: Send + Sync {
    fn prove(
        &self,
        input: &CircuitInput,
        artifacts: &CircuitArtifacts,
    ) -> Result<ProofBundle, AssessmentError>;

    fn verify(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
        vk: &VerificationKey,
    ) -> Result<VerificationOutcome, AssessmentError> {
        verifier::verify(proof, public_signals, vk)
    }
}

// ---------------------------------------------------------------------------
// Groth16
// ---------------------------------------------------------------------------

/// Groth16 over BN254.
#[derive(Default)]
pub struct Groth16Backend {
    keys: DashMap<String, Arc<ProvingKey<Bn254>>>,
}

impl Groth16Backend {
    pub fn new() -> Self {
        Self::default()
    }

    fn proving_key(
        &self,
        artifacts: &CircuitArtifacts,
    ) -> Result<Arc<ProvingKey<Bn254>>, ArtifactFetchError> {
        if let Some(pk) = self.keys.get(&artifacts.fingerprint) {
            return Ok(pk.value().clone());
        }
        let pk = ProvingKey::<Bn254>::deserialize_compressed(artifacts.proving_key.as_ref())
            .map_err(|e| ArtifactFetchError::Corrupt(format!("proving key: {e}")))?;
        let expected = artifacts.manifest.public_signals + 1;
        if pk.vk.gamma_abc_g1.len() != expected {
            return Err(ArtifactFetchError::Incompatible(format!(
                "proving key has {} public inputs, manifest declares {}",
                pk.vk.gamma_abc_g1.len().saturating_sub(1),
                artifacts.manifest.public_signals
            )));
        }
        debug!(fingerprint = %artifacts.fingerprint, "proving key parsed");
        let pk = Arc::new(pk);
        self.keys
            .insert(artifacts.fingerprint.clone(), pk.clone());
        Ok(pk)
    }
}

impl ProvingBackend for Groth16Backend {
    fn prove(
        &self,
        input: &CircuitInput,
        artifacts: &CircuitArtifacts,
    ) -> Result<ProofBundle, AssessmentError> {
        let pk = self.proving_key(artifacts)?;
        let circuit = RangeProofCircuit::new(
            artifacts.manifest.range_bits,
            input.private_value(),
            input.commitment().scalar(),
            input.min_bound(),
            input.max_bound(),
        );

        // Dry run: catch unsatisfiable witnesses and read the instance values.
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit
            .clone()
            .generate_constraints(cs.clone())
            .map_err(|e| AssessmentError::Proving(format!("constraint synthesis failed: {e}")))?;
        let satisfied = cs
            .is_satisfied()
            .map_err(|e| AssessmentError::Proving(format!("constraint check failed: {e}")))?;
        if !satisfied {
            return Err(AssessmentError::Proving(
                "witness does not satisfy the circuit constraints".into(),
            ));
        }
        let instance = cs
            .borrow()
            .map(|cs| cs.instance_assignment[1..].to_vec())
            .ok_or_else(|| AssessmentError::Proving("constraint system unavailable".into()))?;

        let proof = catch_unwind(AssertUnwindSafe(|| {
            let mut rng = ark_std::rand::thread_rng();
            Groth16::<Bn254>::prove(&pk, circuit, &mut rng)
        }))
        .map_err(|_| AssessmentError::Proving("prover panicked".into()))?
        .map_err(|e| AssessmentError::Proving(format!("Groth16 proof generation failed: {e}")))?;

        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| AssessmentError::Proving(format!("proof serialization failed: {e}")))?;

        Ok(ProofBundle {
            proof: Proof::from_bytes(bytes),
            public_signals: PublicSignals::from_field_elements(&instance),
        })
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Output of a local trusted setup.
#[derive(Clone, Debug)]
pub struct CircuitSetup {
    pub manifest: CircuitManifest,
    pub proving_key: Bytes,
    pub verification_key: VerificationKey,
}

impl CircuitSetup {
    /// Proving-side artifacts, as [`super::artifacts::load_artifacts`] would
    /// return them.
    pub fn artifacts(&self) -> CircuitArtifacts {
        CircuitArtifacts::new(self.manifest.clone(), self.proving_key.clone())
    }

    /// An artifact source serving this setup's files.
    pub fn memory_source(&self) -> Result<MemoryArtifactSource, AssessmentError> {
        let id = &self.manifest.circuit_id;
        let manifest = serde_json::to_vec(&self.manifest)
            .map_err(|e| AssessmentError::Encoding(format!("manifest: {e}")))?;
        let source = MemoryArtifactSource::new();
        source.insert(manifest_file(id), manifest);
        source.insert(proving_key_file(id), self.proving_key.clone());
        source.insert(verification_key_file(id), self.verification_key.to_bytes());
        Ok(source)
    }

    /// Write manifest, proving key and verification key into `dir`.
    pub async fn write_to_dir(&self, dir: &Path) -> std::io::Result<()> {
        let id = &self.manifest.circuit_id;
        tokio::fs::create_dir_all(dir).await?;
        let manifest = serde_json::to_vec_pretty(&self.manifest)?;
        tokio::fs::write(dir.join(manifest_file(id)), manifest).await?;
        tokio::fs::write(dir.join(proving_key_file(id)), &self.proving_key).await?;
        tokio::fs::write(
            dir.join(verification_key_file(id)),
            self.verification_key.to_bytes(),
        )
        .await?;
        Ok(())
    }
}

/// Generate Groth16 keys for the range circuit at `range_bits`.
pub fn setup_circuit<R: RngCore + CryptoRng>(
    circuit_id: &str,
    range_bits: usize,
    rng: &mut R,
) -> Result<CircuitSetup, AssessmentError> {
    let manifest = CircuitManifest::range_circuit(circuit_id, range_bits);
    manifest.check_compatible()?;

    let (pk, vk) =
        Groth16::<Bn254>::circuit_specific_setup(RangeProofCircuit::blank(range_bits), rng)
            .map_err(|e| AssessmentError::Proving(format!("circuit setup failed: {e}")))?;

    let mut pk_bytes = Vec::new();
    pk.serialize_compressed(&mut pk_bytes)
        .map_err(|e| AssessmentError::Proving(format!("proving key serialization failed: {e}")))?;
    let verification_key = VerificationKey::from_ark(vk)?;

    info!(
        circuit_id,
        range_bits,
        pk_bytes = pk_bytes.len(),
        vk_fingerprint = %verification_key.fingerprint(),
        "circuit setup complete"
    );

    Ok(CircuitSetup {
        manifest,
        proving_key: Bytes::from(pk_bytes),
        verification_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RANGE_BITS;
    use crate::zkp::artifacts::{load_artifacts, FsArtifactSource};
    use crate::zkp::commitment::commit_u64;
    use crate::zkp::input::{self, CircuitInput};
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use std::sync::OnceLock;

    fn shared_setup() -> &'static CircuitSetup {
        static SETUP: OnceLock<CircuitSetup> = OnceLock::new();
        SETUP.get_or_init(|| {
            let mut rng = StdRng::seed_from_u64(42);
            setup_circuit("range_test", RANGE_BITS, &mut rng).unwrap()
        })
    }

    #[test]
    fn setup_rejects_unsupported_width() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            setup_circuit("wide", RANGE_BITS + 1, &mut rng),
            Err(AssessmentError::ArtifactFetch(ArtifactFetchError::Incompatible(_)))
        ));
    }

    #[test]
    fn prove_valid_assessment() {
        let setup = shared_setup();
        let c = commit_u64(55);
        let input = input::build(55, 0, 100, &c).unwrap();

        let bundle = Groth16Backend::new().prove(&input, &setup.artifacts()).unwrap();
        assert_eq!(bundle.public_signals.as_slice(), input.expected_public_signals().as_slice());

        // Compressed BN254 Groth16 proof: 2 x G1 (32) + 1 x G2 (64).
        assert_eq!(bundle.proof.size(), 128);
    }

    #[test]
    fn out_of_range_witness_proves_false_claim() {
        let setup = shared_setup();
        let c = commit_u64(150);
        let input = CircuitInput::unchecked(150, c, 0, 100);

        let bundle = Groth16Backend::new().prove(&input, &setup.artifacts()).unwrap();
        assert_eq!(bundle.public_signals.as_slice()[0], "0");
    }

    #[test]
    fn unsatisfiable_witness_is_proving_error() {
        let setup = shared_setup();
        // Commitment does not open to the value.
        let input = CircuitInput::unchecked(55, commit_u64(56), 0, 100);

        let err = Groth16Backend::new()
            .prove(&input, &setup.artifacts())
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Proving(_)));
    }

    #[test]
    fn corrupt_proving_key_is_artifact_error() {
        let setup = shared_setup();
        let artifacts = CircuitArtifacts::new(setup.manifest.clone(), Bytes::from_static(&[0u8; 16]));
        let input = input::build(1, 0, 2, &commit_u64(1)).unwrap();

        let err = Groth16Backend::new().prove(&input, &artifacts).unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::ArtifactFetch(ArtifactFetchError::Corrupt(_))
        ));
    }

    #[test]
    fn proving_key_is_parsed_once() {
        let setup = shared_setup();
        let backend = Groth16Backend::new();
        let artifacts = setup.artifacts();
        for v in [10u64, 20] {
            let input = input::build(v as i64, 0, 100, &commit_u64(v)).unwrap();
            backend.prove(&input, &artifacts).unwrap();
        }
        assert_eq!(backend.keys.len(), 1);
    }

    #[tokio::test]
    async fn setup_round_trips_through_directory() {
        let setup = shared_setup();
        let dir = tempfile::tempdir().unwrap();
        setup.write_to_dir(dir.path()).await.unwrap();

        let source = FsArtifactSource::new(dir.path());
        let loaded = load_artifacts(&source, "range_test", Default::default())
            .await
            .unwrap();
        assert_eq!(loaded.fingerprint, setup.artifacts().fingerprint);

        let vk_bytes = std::fs::read(dir.path().join("range_test.vk")).unwrap();
        let vk = VerificationKey::from_bytes(&vk_bytes).unwrap();
        assert_eq!(vk.fingerprint(), setup.verification_key.fingerprint());
    }
}

//! # Proof Service
//!
//! Async front for a [`ProvingBackend`]: fetches the circuit's artifacts
//! through the [`ArtifactCache`], runs the backend on a blocking thread and
//! bounds the run with a timeout.
//!
//! On timeout the awaiting future is dropped and the caller gets
//! [`AssessmentError::ProvingTimeout`]. The blocking thread cannot be
//! interrupted; it finishes in the background and its result is discarded.
//!
//! Nothing here logs or formats the private value. [`CircuitInput`]'s
//! `Debug` output is redacted, and only the commitment and bounds are
//! attached to spans.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use super::artifacts::{ArtifactCache, CircuitArtifacts};
use super::backend::ProvingBackend;
use super::error::AssessmentError;
use super::input::CircuitInput;
use super::proof::ProofBundle;

/// Produces proofs for one circuit.
pub struct ProofService {
    backend: Arc<dyn ProvingBackend>,
    artifacts: Arc<ArtifactCache>,
    circuit_id: String,
    timeout: Duration,
}

impl ProofService {
    pub fn new(
        backend: Arc<dyn ProvingBackend>,
        artifacts: Arc<ArtifactCache>,
        circuit_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            artifacts,
            circuit_id: circuit_id.into(),
            timeout,
        }
    }

    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Prove `input`, returning the proof and the public signals it commits
    /// to.
    ///
    /// # Errors
    ///
    /// - [`AssessmentError::ArtifactFetch`] if the circuit's artifacts cannot
    ///   be loaded.
    /// - [`AssessmentError::Proving`] if the witness is rejected or the
    ///   prover's output disagrees with the input.
    /// - [`AssessmentError::ProvingTimeout`] if the deadline passes.
    #[instrument(
        skip_all,
        fields(
            circuit_id = %self.circuit_id,
            commitment = %input.commitment(),
            min_bound = input.min_bound(),
            max_bound = input.max_bound(),
        )
    )]
    pub async fn prove(&self, input: CircuitInput) -> Result<ProofBundle, AssessmentError> {
        let artifacts = self.artifacts.get(&self.circuit_id).await?;
        let expected = input.expected_public_signals();

        let started = Instant::now();
        let bundle = self.run_blocking(input, artifacts).await?;
        let elapsed = started.elapsed();

        // Everything except the inRange bit is determined by the input.
        if bundle.public_signals.as_slice().get(1..) != expected.get(1..) {
            warn!("prover output does not match the circuit input");
            return Err(AssessmentError::Proving(
                "public signals do not match the circuit input".into(),
            ));
        }

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            proof_bytes = bundle.proof.size(),
            "proof generated"
        );
        Ok(bundle)
    }

    async fn run_blocking(
        &self,
        input: CircuitInput,
        artifacts: Arc<CircuitArtifacts>,
    ) -> Result<ProofBundle, AssessmentError> {
        let backend = self.backend.clone();
        let task = tokio::task::spawn_blocking(move || backend.prove(&input, &artifacts));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "proving task aborted");
                Err(AssessmentError::Proving(format!("proving task failed: {join_err}")))
            }
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "proof generation timed out");
                Err(AssessmentError::ProvingTimeout { timeout_ms })
            }
        }
    }
}

impl std::fmt::Debug for ProofService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofService")
            .field("circuit_id", &self.circuit_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Runs synchronously on the caller's thread. For CLI and bench use where
/// no runtime is available.
pub fn prove_blocking(
    backend: &dyn ProvingBackend,
    input: &CircuitInput,
    artifacts: &CircuitArtifacts,
) -> Result<ProofBundle, AssessmentError> {
    debug!(commitment = %input.commitment(), "proving on caller thread");
    backend.prove(input, artifacts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

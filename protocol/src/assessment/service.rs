use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{AssessmentReceipt, AssessmentRecord};
use crate::config::{ServiceConfig, MAX_SUBJECT_ID_LENGTH};
use crate::storage::{RecordStore, StoreError};
use crate::zkp::{
    commit, input, AssessmentError, ArtifactCache, CircuitInput, Proof, ProofBundle, ProofService,
    ProvingBackend, PublicSignals, VerificationKey, VerificationOutcome,
};

/// Runs range assessments end to end and keeps their audit trail.
///
/// Every dependency is handed in at construction; the service owns no
/// global state and can be shared across tasks behind an `Arc`.
pub struct AssessmentService {
    prover: ProofService,
    backend: Arc<dyn ProvingBackend>,
    verification_key: Arc<VerificationKey>,
    store: Arc<dyn RecordStore>,
}

impl AssessmentService {
    pub fn new(
        backend: Arc<dyn ProvingBackend>,
        artifacts: Arc<ArtifactCache>,
        verification_key: Arc<VerificationKey>,
        store: Arc<dyn RecordStore>,
        config: &ServiceConfig,
    ) -> Self {
        let prover = ProofService::new(
            backend.clone(),
            artifacts,
            config.circuit_id.clone(),
            config.proving_timeout(),
        );
        Self {
            prover,
            backend,
            verification_key,
            store,
        }
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Commit to `private_value`, prove it lies in `[min_bound, max_bound]`,
    /// verify the proof and persist the record.
    ///
    /// Caller errors (`InvalidSubject`, `Encoding`, `RangeViolation`) are
    /// returned before anything is recorded. Once the input is built, a
    /// failure is persisted as a `Failed` record and then returned. If the
    /// returned future is dropped mid-proof, the record is persisted as
    /// `Failed` with kind `cancelled`.
    #[instrument(skip(self, private_value), fields(record_id = tracing::field::Empty))]
    pub async fn submit_assessment(
        &self,
        subject_id: &str,
        private_value: i64,
        min_bound: i64,
        max_bound: i64,
    ) -> Result<AssessmentReceipt, AssessmentError> {
        validate_subject(subject_id)?;

        let commitment = commit(private_value)?;
        let circuit_input = input::build(private_value, min_bound, max_bound, &commitment)?;

        let mut record = AssessmentRecord::new(
            subject_id,
            commitment,
            circuit_input.min_bound(),
            circuit_input.max_bound(),
            self.verification_key.fingerprint(),
        );
        tracing::Span::current().record("record_id", tracing::field::display(record.id));
        record.mark_input_built()?;
        debug!(%commitment, "circuit input built");

        let guard = CancelGuard::new(&record, self.store.as_ref());
        let result = self.prove_and_verify(&mut record, circuit_input).await;
        guard.disarm();
        let (bundle, outcome) = match result {
            Ok(done) => done,
            Err(e) => return Err(self.fail(record, e)),
        };

        self.store.put(&record)?;
        info!(
            subject_id,
            %commitment,
            is_valid = outcome.is_valid,
            diagnostic = ?outcome.diagnostic,
            "assessment recorded"
        );

        Ok(AssessmentReceipt {
            record_id: record.id,
            commitment,
            proof: bundle.proof,
            public_signals: bundle.public_signals,
            is_valid: outcome.is_valid,
        })
    }

    async fn prove_and_verify(
        &self,
        record: &mut AssessmentRecord,
        circuit_input: CircuitInput,
    ) -> Result<(ProofBundle, VerificationOutcome), AssessmentError> {
        let bundle = self.prover.prove(circuit_input).await?;
        record.attach_proof(bundle.clone())?;
        let outcome = self
            .backend
            .verify(&bundle.proof, &bundle.public_signals, &self.verification_key)?;
        record.attach_verification(&outcome)?;
        Ok((bundle, outcome))
    }

    /// Persist `record` as `Failed` and hand `error` back. A store failure
    /// here is logged; the original error wins.
    fn fail(&self, record: AssessmentRecord, error: AssessmentError) -> AssessmentError {
        warn!(record_id = %record.id, kind = error.kind(), error = %error, "assessment failed");
        persist_failed(self.store.as_ref(), record, &error);
        error
    }

    /// Verify a proof and signal vector against this service's key.
    pub fn verify_existing(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
    ) -> Result<VerificationOutcome, AssessmentError> {
        let outcome = self
            .backend
            .verify(proof, public_signals, &self.verification_key)?;
        info!(
            vk_fingerprint = %self.verification_key.fingerprint(),
            is_valid = outcome.is_valid,
            "existing proof verified"
        );
        Ok(outcome)
    }

    /// Re-run verification on a stored record's exact proof and signals.
    ///
    /// Records proven under a different key verify as invalid here; the
    /// stored `is_valid` is left untouched.
    pub fn reverify_record(&self, record_id: Uuid) -> Result<VerificationOutcome, AssessmentError> {
        let record = self
            .store
            .get(&record_id)?
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;
        let bundle = record.bundle().ok_or_else(|| {
            AssessmentError::MalformedInput(format!(
                "record {record_id} has no proof (state: {})",
                record.state
            ))
        })?;
        if record.vk_fingerprint != self.verification_key.fingerprint() {
            warn!(
                %record_id,
                recorded = %record.vk_fingerprint,
                current = %self.verification_key.fingerprint(),
                "record was proven under a different verification key"
            );
        }
        self.verify_existing(&bundle.proof, &bundle.public_signals)
    }

    /// All records for a subject, oldest first.
    pub fn history(&self, subject_id: &str) -> Result<Vec<AssessmentRecord>, AssessmentError> {
        validate_subject(subject_id)?;
        Ok(self.store.list_by_subject(subject_id)?)
    }

    pub fn record(&self, record_id: Uuid) -> Result<Option<AssessmentRecord>, AssessmentError> {
        Ok(self.store.get(&record_id)?)
    }
}

impl std::fmt::Debug for AssessmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentService")
            .field("prover", &self.prover)
            .field("verification_key", &self.verification_key)
            .finish_non_exhaustive()
    }
}

/// Records a built input as `Failed`/`cancelled` if dropped while armed.
///
/// The only await between building the input and a terminal state is the
/// proving run; a caller that stops polling there would otherwise leave no
/// trace of the attempt.
struct CancelGuard<'a> {
    pending: Option<AssessmentRecord>,
    store: &'a dyn RecordStore,
}

impl<'a> CancelGuard<'a> {
    fn new(record: &AssessmentRecord, store: &'a dyn RecordStore) -> Self {
        Self {
            pending: Some(record.clone()),
            store,
        }
    }

    fn disarm(mut self) {
        self.pending = None;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.pending.take() {
            warn!(record_id = %record.id, "assessment cancelled before completion");
            persist_failed(self.store, record, &AssessmentError::Cancelled);
        }
    }
}

fn persist_failed(store: &dyn RecordStore, mut record: AssessmentRecord, error: &AssessmentError) {
    if let Err(e) = record.mark_failed(error) {
        warn!(error = %e, "could not mark record failed");
        return;
    }
    if let Err(e) = store.put(&record) {
        warn!(record_id = %record.id, error = %e, "could not persist failed record");
    }
}

fn validate_subject(subject_id: &str) -> Result<(), AssessmentError> {
    if subject_id.trim().is_empty() {
        return Err(AssessmentError::InvalidSubject("subject id is empty".into()));
    }
    if subject_id.len() > MAX_SUBJECT_ID_LENGTH {
        return Err(AssessmentError::InvalidSubject(format!(
            "subject id exceeds {MAX_SUBJECT_ID_LENGTH} bytes"
        )));
    }
    if subject_id.chars().any(char::is_control) {
        return Err(AssessmentError::InvalidSubject(
            "subject id contains control characters".into(),
        ));
    }
    Ok(())
}

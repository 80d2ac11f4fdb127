//! Error types for the assessment workflow.
//!
//! Every fallible step of commit → build → prove → verify → persist returns
//! an [`AssessmentError`]. A well-formed proof that simply does not verify is
//! **not** an error; it is a [`super::VerificationOutcome`] with
//! `is_valid == false`.
//!
//! No variant carries the private value. Messages describe which check
//! failed, never the number that failed it.

use thiserror::Error;

use super::artifacts::ArtifactFetchError;
use crate::storage::StoreError;

/// Errors that can occur while producing or checking an assessment.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The private value (or a bound) cannot be represented as a circuit
    /// field element.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Bounds are inconsistent or the value lies outside the declared range.
    #[error("range violation: {0}")]
    RangeViolation(String),

    /// The subject identifier is empty or too long.
    #[error("invalid subject identifier: {0}")]
    InvalidSubject(String),

    /// Circuit artifacts are missing, corrupt or belong to another circuit.
    #[error("artifact fetch failed: {0}")]
    ArtifactFetch(#[from] ArtifactFetchError),

    /// The prover rejected the witness or failed internally.
    #[error("proof generation failed: {0}")]
    Proving(String),

    /// Proving did not finish within the configured deadline.
    #[error("proof generation timed out after {timeout_ms}ms")]
    ProvingTimeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The caller stopped waiting before the assessment reached a terminal
    /// state. Only ever stored on a record; no caller sees it returned.
    #[error("assessment cancelled before completion")]
    Cancelled,

    /// The verifier was handed an ill-shaped proof or signal vector.
    #[error("malformed verifier input: {0}")]
    MalformedInput(String),

    /// An assessment record was asked to move backwards or out of a
    /// terminal state.
    #[error("illegal assessment state transition: {from} -> {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },

    /// The record store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AssessmentError {
    /// `true` when the caller supplied bad input; `false` when the system
    /// could not complete the work.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AssessmentError::Encoding(_)
                | AssessmentError::RangeViolation(_)
                | AssessmentError::InvalidSubject(_)
                | AssessmentError::MalformedInput(_)
        )
    }

    /// Stable machine-readable code, used in API error bodies and metrics
    /// labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AssessmentError::Encoding(_) => "encoding_error",
            AssessmentError::RangeViolation(_) => "range_violation",
            AssessmentError::InvalidSubject(_) => "invalid_subject",
            AssessmentError::ArtifactFetch(_) => "artifact_fetch_error",
            AssessmentError::Proving(_) => "proving_error",
            AssessmentError::ProvingTimeout { .. } => "proving_timeout",
            AssessmentError::Cancelled => "cancelled",
            AssessmentError::MalformedInput(_) => "malformed_input",
            AssessmentError::IllegalTransition { .. } => "illegal_transition",
            AssessmentError::Storage(_) => "storage_error",
        }
    }
}

//! # Assessment Workflow
//!
//! Composes the ZKP pieces into the two operations callers use:
//!
//! - [`AssessmentService::submit_assessment`]: commit, build, prove, verify
//!   and persist, in that order.
//! - [`AssessmentService::verify_existing`]: re-check any proof and signal
//!   vector against the service's verification key.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──> InputBuilt ──> Proven ──> Verified
//!    │             │            │
//!    └─────────────┴────────────┴─────> Failed
//! ```
//!
//! Transitions only move forward and never skip a step. `Verified` and
//! `Failed` are terminal: the record is immutable from then on. A second
//! submission for the same subject appends a new record; nothing is updated
//! in place.

mod service;

pub use service::AssessmentService;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::zkp::{AssessmentError, Commitment, Proof, ProofBundle, PublicSignals, VerificationOutcome};

// ---------------------------------------------------------------------------
// AssessmentState
// ---------------------------------------------------------------------------

/// Where an assessment is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentState {
    Created,
    InputBuilt,
    Proven,
    Verified,
    Failed,
}

impl AssessmentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AssessmentState::Verified | AssessmentState::Failed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(self, next: AssessmentState) -> bool {
        use AssessmentState::*;
        matches!(
            (self, next),
            (Created, InputBuilt)
                | (InputBuilt, Proven)
                | (Proven, Verified)
                | (Created | InputBuilt | Proven, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentState::Created => "created",
            AssessmentState::InputBuilt => "input_built",
            AssessmentState::Proven => "proven",
            AssessmentState::Verified => "verified",
            AssessmentState::Failed => "failed",
        }
    }
}

impl fmt::Display for AssessmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssessmentRecord
// ---------------------------------------------------------------------------

/// One assessment, as persisted.
///
/// `proof` and `public_signals` are set together when the record reaches
/// `Proven`; `is_valid` is set only by the verifier and stays `None` for
/// failed assessments. `is_valid` applies to the stored triple
/// (`proof`, `public_signals`, key with `vk_fingerprint`) and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub subject_id: String,
    pub commitment: Commitment,
    pub min_bound: i64,
    pub max_bound: i64,
    pub proof: Option<Proof>,
    pub public_signals: Option<PublicSignals>,
    pub is_valid: Option<bool>,
    pub state: AssessmentState,
    /// Error kind that moved the record to `Failed`.
    pub failure: Option<String>,
    pub vk_fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn new(
        subject_id: impl Into<String>,
        commitment: Commitment,
        min_bound: i64,
        max_bound: i64,
        vk_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            commitment,
            min_bound,
            max_bound,
            proof: None,
            public_signals: None,
            is_valid: None,
            state: AssessmentState::Created,
            failure: None,
            vk_fingerprint: vk_fingerprint.into(),
            created_at: Utc::now(),
        }
    }

    fn transition(&mut self, next: AssessmentState) -> Result<(), AssessmentError> {
        if !self.state.can_transition_to(next) {
            return Err(AssessmentError::IllegalTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn mark_input_built(&mut self) -> Result<(), AssessmentError> {
        self.transition(AssessmentState::InputBuilt)
    }

    pub fn attach_proof(&mut self, bundle: ProofBundle) -> Result<(), AssessmentError> {
        self.transition(AssessmentState::Proven)?;
        self.proof = Some(bundle.proof);
        self.public_signals = Some(bundle.public_signals);
        Ok(())
    }

    pub fn attach_verification(&mut self, outcome: &VerificationOutcome) -> Result<(), AssessmentError> {
        self.transition(AssessmentState::Verified)?;
        self.is_valid = Some(outcome.is_valid);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: &AssessmentError) -> Result<(), AssessmentError> {
        self.transition(AssessmentState::Failed)?;
        self.failure = Some(error.kind().to_string());
        Ok(())
    }

    /// The stored proof and signals, if the record got that far.
    pub fn bundle(&self) -> Option<ProofBundle> {
        Some(ProofBundle {
            proof: self.proof.clone()?,
            public_signals: self.public_signals.clone()?,
        })
    }
}

// ---------------------------------------------------------------------------
// AssessmentReceipt
// ---------------------------------------------------------------------------

/// What `submit_assessment` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReceipt {
    pub record_id: Uuid,
    pub commitment: Commitment,
    pub proof: Proof,
    pub public_signals: PublicSignals,
    pub is_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkp::commitment::commit_u64;
    use crate::zkp::VerificationDiagnostic;

    fn record() -> AssessmentRecord {
        AssessmentRecord::new("patient-42", commit_u64(55), 0, 100, "fp")
    }

    fn bundle() -> ProofBundle {
        ProofBundle {
            proof: Proof::from_bytes(vec![1; 128]),
            public_signals: PublicSignals::new(vec!["1".into(); 4]),
        }
    }

    const VALID: VerificationOutcome = VerificationOutcome {
        is_valid: true,
        diagnostic: VerificationDiagnostic::Valid,
    };

    #[test]
    fn happy_path_walks_every_state() {
        let mut r = record();
        assert_eq!(r.state, AssessmentState::Created);
        r.mark_input_built().unwrap();
        r.attach_proof(bundle()).unwrap();
        assert_eq!(r.state, AssessmentState::Proven);
        assert!(r.is_valid.is_none(), "only the verifier sets isValid");
        r.attach_verification(&VALID).unwrap();
        assert_eq!(r.state, AssessmentState::Verified);
        assert_eq!(r.is_valid, Some(true));
        assert_eq!(r.bundle(), Some(bundle()));
    }

    #[test]
    fn steps_cannot_be_skipped() {
        let mut r = record();
        assert!(matches!(
            r.attach_proof(bundle()),
            Err(AssessmentError::IllegalTransition { from: "created", to: "proven" })
        ));
        assert!(r.proof.is_none());
        r.mark_input_built().unwrap();
        assert!(r.attach_verification(&VALID).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut r = record();
        r.mark_input_built().unwrap();
        r.mark_failed(&AssessmentError::ProvingTimeout { timeout_ms: 1 }).unwrap();
        assert_eq!(r.failure.as_deref(), Some("proving_timeout"));
        assert!(r.attach_proof(bundle()).is_err());
        assert!(r.mark_failed(&AssessmentError::Proving("x".into())).is_err());

        let mut v = record();
        v.mark_input_built().unwrap();
        v.attach_proof(bundle()).unwrap();
        v.attach_verification(&VALID).unwrap();
        assert!(v.mark_failed(&AssessmentError::Proving("x".into())).is_err());
        assert_eq!(v.is_valid, Some(true));
    }

    #[test]
    fn transition_table() {
        use AssessmentState::*;
        let all = [Created, InputBuilt, Proven, Verified, Failed];
        let legal: Vec<_> = all
            .iter()
            .flat_map(|&a| all.iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| a.can_transition_to(b))
            .collect();
        assert_eq!(
            legal,
            vec![
                (Created, InputBuilt),
                (Created, Failed),
                (InputBuilt, Proven),
                (InputBuilt, Failed),
                (Proven, Verified),
                (Proven, Failed),
            ]
        );
    }

    #[test]
    fn record_survives_bincode() {
        let mut r = record();
        r.mark_input_built().unwrap();
        r.attach_proof(bundle()).unwrap();
        r.attach_verification(&VALID).unwrap();
        let bytes = bincode::serialize(&r).unwrap();
        let back: AssessmentRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn receipt_json_is_camel_case() {
        let receipt = AssessmentReceipt {
            record_id: Uuid::nil(),
            commitment: commit_u64(55),
            proof: Proof::from_bytes(vec![0xab]),
            public_signals: PublicSignals::new(vec!["1".into()]),
            is_valid: true,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["recordId"], Uuid::nil().to_string());
        assert_eq!(json["commitment"], commit_u64(55).to_hex());
    }
}
